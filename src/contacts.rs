//! Who may talk to whom. The relation is never stored: a hospital and a
//! professional are contacts while an accepted application links them.

use std::collections::HashMap;

use diesel::dsl::{count_star, exists};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::access::require_hospital;
use crate::applications::ApplicationStatus;
use crate::error::ServiceResult;
use crate::identity::{Actor, Role};
use crate::schema::{applications, jobs, messages, users};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub avatar_url: Option<String>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub specialty: Option<String>,
}

fn accepted() -> &'static str {
    ApplicationStatus::Accepted.as_str()
}

/// Professionals holding an accepted application on any of the hospital's jobs.
pub fn employee_ids(conn: &mut PgConnection, hospital_id: Uuid) -> QueryResult<Vec<Uuid>> {
    applications::table
        .inner_join(jobs::table)
        .filter(jobs::hospital_id.eq(hospital_id))
        .filter(applications::status.eq(accepted()))
        .select(applications::doctor_id)
        .distinct()
        .load(conn)
}

/// Hospitals for which the professional holds an accepted application.
pub fn employer_ids(conn: &mut PgConnection, professional_id: Uuid) -> QueryResult<Vec<Uuid>> {
    applications::table
        .inner_join(jobs::table)
        .filter(applications::doctor_id.eq(professional_id))
        .filter(applications::status.eq(accepted()))
        .select(jobs::hospital_id)
        .distinct()
        .load(conn)
}

/// Contact ids for the actor, recomputed from current application statuses.
pub fn contact_ids(conn: &mut PgConnection, actor: &Actor) -> QueryResult<Vec<Uuid>> {
    match actor.role {
        Role::Hospital => employee_ids(conn, actor.id),
        _ => employer_ids(conn, actor.id),
    }
}

/// True when an accepted application links the two users, in either direction.
pub fn are_contacts(conn: &mut PgConnection, a: Uuid, b: Uuid) -> QueryResult<bool> {
    diesel::select(exists(
        applications::table
            .inner_join(jobs::table)
            .filter(applications::status.eq(accepted()))
            .filter(
                jobs::hospital_id
                    .eq(a)
                    .and(applications::doctor_id.eq(b))
                    .or(jobs::hospital_id.eq(b).and(applications::doctor_id.eq(a))),
            ),
    ))
    .get_result(conn)
}

pub fn get_contacts(conn: &mut PgConnection, actor: &Actor) -> ServiceResult<Vec<Contact>> {
    let ids = contact_ids(conn, actor)?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let people: Vec<(Uuid, String, String, Option<String>)> = users::table
        .filter(users::id.eq_any(&ids))
        .order((users::name.asc(), users::id.asc()))
        .select((users::id, users::name, users::role, users::avatar_url))
        .load(conn)?;

    let unread_rows: Vec<(Uuid, i64)> = messages::table
        .filter(messages::receiver_id.eq(actor.id))
        .filter(messages::is_read.eq(false))
        .filter(messages::sender_id.eq_any(&ids))
        .group_by(messages::sender_id)
        .select((messages::sender_id, count_star()))
        .load(conn)?;
    let unread: HashMap<Uuid, i64> = unread_rows.into_iter().collect();

    Ok(people
        .into_iter()
        .map(|(id, name, role, avatar_url)| Contact {
            unread_count: unread.get(&id).copied().unwrap_or(0),
            id,
            name,
            role,
            avatar_url,
        })
        .collect())
}

/// Upload targets for a hospital's document picker: the same people as its contacts.
pub fn list_employees_of(conn: &mut PgConnection, actor: &Actor) -> ServiceResult<Vec<Employee>> {
    require_hospital(actor)?;
    let ids = employee_ids(conn, actor.id)?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    Ok(users::table
        .filter(users::id.eq_any(&ids))
        .order((users::name.asc(), users::id.asc()))
        .select((users::id, users::name, users::role, users::specialty))
        .load(conn)?)
}
