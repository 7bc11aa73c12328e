use chrono::{NaiveDate, NaiveDateTime};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::access::require_document_sender;
use crate::contacts::are_contacts;
use crate::db::{self, PgPool};
use crate::error::{ServiceError, ServiceResult};
use crate::identity::{Actor, Role};
use crate::models::{Document, NewDocument};
use crate::schema::{documents, users};
use crate::storage::{store_file, ObjectStorage};
use crate::utils::time::serialize_iso;

const MAX_FILE_NAME_LEN: usize = 255;

/// A file a hospital (or admin) is sending to a professional.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub recipient_id: Uuid,
    pub month: String,
    pub file_name: Option<String>,
    pub original_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct ReceivedDocument {
    pub id: Uuid,
    pub uploader_id: Uuid,
    pub user_id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub month: String,
    #[serde(serialize_with = "serialize_iso")]
    pub created_at: NaiveDateTime,
    pub uploader_name: String,
}

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct SentDocument {
    pub id: Uuid,
    pub uploader_id: Uuid,
    pub user_id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub month: String,
    #[serde(serialize_with = "serialize_iso")]
    pub created_at: NaiveDateTime,
    pub recipient_name: String,
}

/// Month labels are calendar months, `YYYY-MM`.
pub fn normalize_month(raw: &str) -> ServiceResult<String> {
    let month = raw.trim();
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .ok()
        .filter(|_| month.len() == 7)
        .map(|_| month.to_string())
        .ok_or_else(|| ServiceError::validation("month must be formatted as YYYY-MM"))
}

fn display_name(file_name: Option<String>, original_name: &str) -> ServiceResult<String> {
    let name = file_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| original_name.trim().to_string());
    if name.is_empty() {
        return Err(ServiceError::validation("file name is required"));
    }
    Ok(name.chars().take(MAX_FILE_NAME_LEN).collect())
}

/// Hospitals may only send to their own employees; admins to any professional.
fn check_recipient(conn: &mut PgConnection, actor: &Actor, recipient_id: Uuid) -> ServiceResult<()> {
    let role: String = users::table
        .find(recipient_id)
        .select(users::role)
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("recipient not found"))?;
    let is_professional = role
        .parse::<Role>()
        .map(Role::is_professional)
        .unwrap_or(false);
    if !is_professional {
        return Err(ServiceError::validation(
            "documents can only be sent to doctors or nurses",
        ));
    }

    if actor.role == Role::Hospital && !are_contacts(conn, actor.id, recipient_id)? {
        return Err(ServiceError::Authorization(
            "recipient is not one of your employees".to_string(),
        ));
    }
    Ok(())
}

/// Validates the request, stores the blob, then records who it is for.
pub async fn upload(
    pool: &PgPool,
    storage: &dyn ObjectStorage,
    actor: &Actor,
    request: DocumentUpload,
) -> ServiceResult<Document> {
    require_document_sender(actor)?;
    let DocumentUpload {
        recipient_id,
        month,
        file_name,
        original_name,
        content_type,
        bytes,
    } = request;

    if bytes.is_empty() {
        return Err(ServiceError::validation("file must not be empty"));
    }
    let month = normalize_month(&month)?;
    let file_name = display_name(file_name, &original_name)?;

    {
        let mut conn = db::checkout(pool)?;
        check_recipient(&mut conn, actor, recipient_id)?;
    }

    let stored = store_file(storage, "documents", "doc", bytes, &original_name, content_type)
        .await
        .map_err(|err| {
            error!(error = %err, uploader_id = %actor.id, "failed to store document");
            ServiceError::Internal(err)
        })?;

    let document = db::checkout(pool)
        .map_err(ServiceError::from)
        .and_then(|mut conn| {
            diesel::insert_into(documents::table)
                .values(&NewDocument {
                    id: Uuid::new_v4(),
                    uploader_id: actor.id,
                    user_id: recipient_id,
                    file_url: stored.url.clone(),
                    file_name,
                    month,
                })
                .returning(Document::as_returning())
                .get_result(&mut conn)
                .map_err(ServiceError::from)
        })
        .map_err(|err| {
            error!(
                error = %err,
                key = %stored.key,
                uploader_id = %actor.id,
                "document row not recorded; stored object is orphaned"
            );
            err
        })?;

    info!(
        document_id = %document.id,
        uploader_id = %actor.id,
        user_id = %recipient_id,
        key = %stored.key,
        "document uploaded"
    );
    Ok(document)
}

/// Documents addressed to the actor, newest first.
pub fn list_mine(conn: &mut PgConnection, actor: &Actor) -> ServiceResult<Vec<ReceivedDocument>> {
    Ok(documents::table
        .inner_join(users::table.on(users::id.eq(documents::uploader_id)))
        .filter(documents::user_id.eq(actor.id))
        .order((documents::created_at.desc(), documents::id.asc()))
        .select((
            documents::id,
            documents::uploader_id,
            documents::user_id,
            documents::file_url,
            documents::file_name,
            documents::month,
            documents::created_at,
            users::name,
        ))
        .load(conn)?)
}

/// Documents the actor has sent, newest first.
pub fn list_sent(conn: &mut PgConnection, actor: &Actor) -> ServiceResult<Vec<SentDocument>> {
    Ok(documents::table
        .inner_join(users::table.on(users::id.eq(documents::user_id)))
        .filter(documents::uploader_id.eq(actor.id))
        .order((documents::created_at.desc(), documents::id.asc()))
        .select((
            documents::id,
            documents::uploader_id,
            documents::user_id,
            documents::file_url,
            documents::file_name,
            documents::month,
            documents::created_at,
            users::name,
        ))
        .load(conn)?)
}
