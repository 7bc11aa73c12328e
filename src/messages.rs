use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use tracing::info;
use uuid::Uuid;

use crate::contacts::{are_contacts, get_contacts, Contact};
use crate::error::{ServiceError, ServiceResult};
use crate::identity::{Actor, Role};
use crate::models::{Message, NewMessage};
use crate::schema::{messages, users};

/// Appends a message. Only derived contacts may write to each other; admins may
/// write to anyone.
pub fn send(
    conn: &mut PgConnection,
    actor: &Actor,
    receiver_id: Uuid,
    content: &str,
) -> ServiceResult<Message> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::validation("content must not be empty"));
    }
    if receiver_id == actor.id {
        return Err(ServiceError::validation("cannot send a message to yourself"));
    }

    let allowed = if actor.role == Role::Admin {
        diesel::select(exists(users::table.find(receiver_id))).get_result(conn)?
    } else {
        are_contacts(conn, actor.id, receiver_id)?
    };
    if !allowed {
        return Err(ServiceError::Authorization(
            "receiver is not one of your contacts".to_string(),
        ));
    }

    let message = diesel::insert_into(messages::table)
        .values(&NewMessage {
            id: Uuid::new_v4(),
            sender_id: actor.id,
            receiver_id,
            content: content.to_string(),
        })
        .returning(Message::as_returning())
        .get_result(conn)?;

    info!(message_id = %message.id, sender_id = %actor.id, %receiver_id, "message sent");
    Ok(message)
}

/// The full conversation between the actor and `other`, oldest first.
pub fn history(conn: &mut PgConnection, actor: &Actor, other: Uuid) -> ServiceResult<Vec<Message>> {
    Ok(messages::table
        .filter(
            messages::sender_id
                .eq(actor.id)
                .and(messages::receiver_id.eq(other))
                .or(messages::sender_id.eq(other).and(messages::receiver_id.eq(actor.id))),
        )
        .order((messages::created_at.asc(), messages::id.asc()))
        .select(Message::as_select())
        .load(conn)?)
}

/// Marks everything `other` sent to the actor as read. Returns how many changed.
pub fn mark_read(conn: &mut PgConnection, actor: &Actor, other: Uuid) -> ServiceResult<usize> {
    let updated = diesel::update(
        messages::table
            .filter(messages::sender_id.eq(other))
            .filter(messages::receiver_id.eq(actor.id))
            .filter(messages::is_read.eq(false)),
    )
    .set(messages::is_read.eq(true))
    .execute(conn)?;
    Ok(updated)
}

pub fn contacts(conn: &mut PgConnection, actor: &Actor) -> ServiceResult<Vec<Contact>> {
    get_contacts(conn, actor)
}
