//! Role gates and ownership checks applied before restricted reads and writes.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::identity::{Actor, Role};
use crate::models::{Application, Job};
use crate::schema::{applications, jobs};

pub fn require_role(actor: &Actor, allowed: &[Role]) -> ServiceResult<()> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(ServiceError::forbidden())
    }
}

pub fn require_hospital(actor: &Actor) -> ServiceResult<()> {
    require_role(actor, &[Role::Hospital])
}

pub fn require_doctor(actor: &Actor) -> ServiceResult<()> {
    require_role(actor, &[Role::Doctor])
}

pub fn require_admin(actor: &Actor) -> ServiceResult<()> {
    require_role(actor, &[Role::Admin])
}

pub fn require_document_sender(actor: &Actor) -> ServiceResult<()> {
    require_role(actor, &[Role::Hospital, Role::Admin])
}

/// Loads a job only if the actor is the hospital that posted it.
pub fn owned_job(conn: &mut PgConnection, actor: &Actor, job_id: Uuid) -> ServiceResult<Job> {
    require_hospital(actor)?;
    jobs::table
        .filter(jobs::id.eq(job_id))
        .filter(jobs::hospital_id.eq(actor.id))
        .select(Job::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(ServiceError::not_owned)
}

/// Loads an application only if its parent job belongs to the actor.
pub fn owned_application(
    conn: &mut PgConnection,
    actor: &Actor,
    application_id: Uuid,
) -> ServiceResult<Application> {
    require_hospital(actor)?;
    applications::table
        .inner_join(jobs::table)
        .filter(applications::id.eq(application_id))
        .filter(jobs::hospital_id.eq(actor.id))
        .select(Application::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(ServiceError::not_owned)
}
