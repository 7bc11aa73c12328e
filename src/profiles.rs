use chrono::{NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::access::require_admin;
use crate::accounts::{check_password, find_user, Profile};
use crate::auth::password;
use crate::db::{self, PgPool};
use crate::error::{ServiceError, ServiceResult};
use crate::identity::{Actor, SubscriptionTier};
use crate::models::User;
use crate::schema::users;
use crate::storage::{store_file, ObjectStorage};
use crate::utils::json::{classify_array, classify_nullable, NullableValue};

#[derive(AsChangeset, Default)]
#[diesel(table_name = users)]
struct ProfileChangeset {
    name: Option<String>,
    phone: Option<Option<String>>,
    bio: Option<Option<String>>,
    specialty: Option<Option<String>>,
    location: Option<Option<String>>,
    registration: Option<Option<String>>,
    specialties: Option<Value>,
    experiences: Option<Value>,
    password_hash: Option<String>,
    updated_at: Option<NaiveDateTime>,
}

fn text_field(body: &Value, field: &str) -> ServiceResult<Option<Option<String>>> {
    let classified = classify_nullable(body.get(field))
        .map_err(|err| ServiceError::validation(format!("{field}: {err}")))?;
    Ok(match classified {
        NullableValue::Omitted => None,
        NullableValue::Null => Some(None),
        NullableValue::Present(text) => {
            let text = text.trim().to_string();
            Some((!text.is_empty()).then_some(text))
        }
    })
}

fn list_field(body: &Value, field: &str) -> ServiceResult<Option<Value>> {
    let classified = classify_array(body.get(field))
        .map_err(|err| ServiceError::validation(format!("{field}: {err}")))?;
    Ok(match classified {
        NullableValue::Omitted => None,
        NullableValue::Null => Some(Value::Array(Vec::new())),
        NullableValue::Present(list) => Some(list),
    })
}

fn password_field<'a>(body: &'a Value, field: &str) -> ServiceResult<Option<&'a str>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.as_str())),
        Some(_) => Err(ServiceError::validation(format!("{field} must be a string"))),
    }
}

fn build_changeset(body: &Value) -> ServiceResult<ProfileChangeset> {
    if !body.is_object() {
        return Err(ServiceError::validation("profile update must be a JSON object"));
    }

    let name = match classify_nullable(body.get("name"))
        .map_err(|err| ServiceError::validation(format!("name: {err}")))?
    {
        NullableValue::Omitted => None,
        NullableValue::Null => return Err(ServiceError::validation("name must not be empty")),
        NullableValue::Present(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::validation("name must not be empty"));
            }
            Some(name)
        }
    };

    let password_hash = match password_field(body, "password")? {
        None => None,
        Some(new_password) => {
            let confirmation = match password_field(body, "confirm_password")? {
                Some(value) => Some(value),
                None => password_field(body, "confirmPassword")?,
            };
            if confirmation != Some(new_password) {
                return Err(ServiceError::validation("passwords do not match"));
            }
            check_password(new_password)?;
            Some(password::hash_password(new_password)?)
        }
    };

    Ok(ProfileChangeset {
        name,
        phone: text_field(body, "phone")?,
        bio: text_field(body, "bio")?,
        specialty: text_field(body, "specialty")?,
        location: text_field(body, "location")?,
        registration: text_field(body, "registration")?,
        specialties: list_field(body, "specialties")?,
        experiences: list_field(body, "experiences")?,
        password_hash,
        updated_at: Some(Utc::now().naive_utc()),
    })
}

pub fn get_profile(conn: &mut PgConnection, actor: &Actor) -> ServiceResult<Profile> {
    Ok(find_user(conn, actor.id)?.into())
}

/// Applies a partial update to the actor's own profile. Omitted fields stay as
/// they are and `null` clears them.
pub fn update_profile(conn: &mut PgConnection, actor: &Actor, body: &Value) -> ServiceResult<Profile> {
    let changes = build_changeset(body)?;
    let password_changed = changes.password_hash.is_some();

    let user = diesel::update(users::table.find(actor.id))
        .set(&changes)
        .returning(User::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("user not found"))?;

    info!(user_id = %user.id, password_changed, "profile updated");
    Ok(user.into())
}

/// Stores a new avatar image and points the actor's profile at it.
pub async fn upload_avatar(
    pool: &PgPool,
    storage: &dyn ObjectStorage,
    actor: &Actor,
    original_name: &str,
    content_type: Option<String>,
    bytes: Vec<u8>,
) -> ServiceResult<Profile> {
    if bytes.is_empty() {
        return Err(ServiceError::validation("file must not be empty"));
    }
    let is_image = content_type
        .clone()
        .or_else(|| {
            mime_guess::from_path(original_name)
                .first()
                .map(|mime| mime.essence_str().to_string())
        })
        .map(|mime| mime.starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(ServiceError::validation("avatar must be an image"));
    }

    let stored = store_file(storage, "avatars", "avatar", bytes, original_name, content_type)
        .await
        .map_err(|err| {
            error!(error = %err, user_id = %actor.id, "failed to store avatar");
            ServiceError::Internal(err)
        })?;

    let mut conn = db::checkout(pool)?;
    let user = diesel::update(users::table.find(actor.id))
        .set((
            users::avatar_url.eq(&stored.url),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .returning(User::as_returning())
        .get_result(&mut conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("user not found"))?;

    info!(user_id = %user.id, key = %stored.key, "avatar updated");
    Ok(user.into())
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountFlags {
    pub subscription_tier: Option<SubscriptionTier>,
    pub is_verified: Option<bool>,
}

/// Admin-only: changes a hospital's plan or a user's verification badge.
pub fn update_account(
    conn: &mut PgConnection,
    actor: &Actor,
    user_id: Uuid,
    flags: AccountFlags,
) -> ServiceResult<Profile> {
    require_admin(actor)?;
    if flags.subscription_tier.is_none() && flags.is_verified.is_none() {
        return Err(ServiceError::validation(
            "nothing to update: provide subscription_tier or is_verified",
        ));
    }

    let user = find_user(conn, user_id)?;
    let is_verified = flags.is_verified.unwrap_or(user.is_verified);
    let subscription_tier = flags
        .subscription_tier
        .map(|tier| tier.as_str().to_string())
        .or(user.subscription_tier);

    let updated = diesel::update(users::table.find(user_id))
        .set((
            users::subscription_tier.eq(subscription_tier),
            users::is_verified.eq(is_verified),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .returning(User::as_returning())
        .get_result(conn)?;

    info!(
        admin_id = %actor.id,
        user_id = %updated.id,
        tier = ?updated.subscription_tier,
        is_verified = updated.is_verified,
        "account flags updated"
    );
    Ok(updated.into())
}
