use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::access::{owned_application, owned_job, require_doctor};
use crate::error::{ServiceError, ServiceResult};
use crate::identity::Actor;
use crate::jobs::STATUS_OPEN;
use crate::models::{Application, NewApplication};
use crate::schema::{applications, jobs, users};
use crate::utils::time::{serialize_clock, serialize_iso};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(ApplicationStatus::Pending),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(ServiceError::validation("invalid status")),
        }
    }
}

/// A hospital's verdict on an application. Only these two values are writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn parse(value: &str) -> ServiceResult<Self> {
        match value.parse::<ApplicationStatus>() {
            Ok(ApplicationStatus::Accepted) => Ok(Decision::Accept),
            Ok(ApplicationStatus::Rejected) => Ok(Decision::Reject),
            _ => Err(ServiceError::validation(
                "status must be either \"accepted\" or \"rejected\"",
            )),
        }
    }

    pub fn status(self) -> ApplicationStatus {
        match self {
            Decision::Accept => ApplicationStatus::Accepted,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }
}

/// An application as the applying doctor sees it.
#[derive(Debug, Clone, Serialize, Queryable)]
pub struct MyApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub doctor_id: Uuid,
    pub status: String,
    #[serde(serialize_with = "serialize_iso")]
    pub created_at: NaiveDateTime,
    pub title: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_clock")]
    pub start_time: NaiveTime,
    #[serde(serialize_with = "serialize_clock")]
    pub end_time: NaiveTime,
    pub location: Option<String>,
    pub hospital_name: String,
}

/// An application as the reviewing hospital sees it.
#[derive(Debug, Clone, Serialize, Queryable)]
pub struct JobApplicant {
    pub id: Uuid,
    pub job_id: Uuid,
    pub doctor_id: Uuid,
    pub status: String,
    #[serde(serialize_with = "serialize_iso")]
    pub created_at: NaiveDateTime,
    pub doctor_name: String,
    pub doctor_email: String,
}

/// Submits a pending application. The job row is locked so a concurrent close
/// cannot slip in between the open check and the insert.
pub fn apply(conn: &mut PgConnection, actor: &Actor, job_id: Uuid) -> ServiceResult<Application> {
    require_doctor(actor)?;

    let application = conn.transaction::<_, ServiceError, _>(|conn| {
        let job_status: String = jobs::table
            .find(job_id)
            .select(jobs::status)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found("job not found"))?;
        if job_status != STATUS_OPEN {
            return Err(ServiceError::validation("job is not open for applications"));
        }

        let new_application = NewApplication {
            id: Uuid::new_v4(),
            job_id,
            doctor_id: actor.id,
            status: ApplicationStatus::Pending.as_str().to_string(),
        };

        diesel::insert_into(applications::table)
            .values(&new_application)
            .returning(Application::as_returning())
            .get_result(conn)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    ServiceError::Conflict("already applied for this job".to_string())
                }
                other => other.into(),
            })
    })?;

    info!(application_id = %application.id, %job_id, doctor_id = %actor.id, "application submitted");
    Ok(application)
}

/// Records the owning hospital's decision. Earlier decisions are overwritten.
pub fn update_status(
    conn: &mut PgConnection,
    actor: &Actor,
    application_id: Uuid,
    status: &str,
) -> ServiceResult<Application> {
    let decision = Decision::parse(status)?;
    let application = owned_application(conn, actor, application_id)?;

    let updated = diesel::update(applications::table.find(application.id))
        .set(applications::status.eq(decision.status().as_str()))
        .returning(Application::as_returning())
        .get_result(conn)?;

    info!(
        application_id = %updated.id,
        previous = %application.status,
        status = %updated.status,
        "application decided"
    );
    Ok(updated)
}

/// The doctor's own applications, newest first.
pub fn list_my_applications(
    conn: &mut PgConnection,
    actor: &Actor,
) -> ServiceResult<Vec<MyApplication>> {
    require_doctor(actor)?;
    Ok(applications::table
        .inner_join(jobs::table)
        .inner_join(users::table.on(users::id.eq(jobs::hospital_id)))
        .filter(applications::doctor_id.eq(actor.id))
        .order(applications::created_at.desc())
        .select((
            applications::id,
            applications::job_id,
            applications::doctor_id,
            applications::status,
            applications::created_at,
            jobs::title,
            jobs::date,
            jobs::start_time,
            jobs::end_time,
            jobs::location,
            users::name,
        ))
        .load(conn)?)
}

/// Applicants for one of the actor's jobs, oldest first so review is first-come-first-served.
pub fn list_job_applications(
    conn: &mut PgConnection,
    actor: &Actor,
    job_id: Uuid,
) -> ServiceResult<Vec<JobApplicant>> {
    let job = owned_job(conn, actor, job_id)?;
    Ok(applications::table
        .inner_join(users::table.on(users::id.eq(applications::doctor_id)))
        .filter(applications::job_id.eq(job.id))
        .order(applications::created_at.asc())
        .select((
            applications::id,
            applications::job_id,
            applications::doctor_id,
            applications::status,
            applications::created_at,
            users::name,
            users::email,
        ))
        .load(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_terminal_states_are_valid_decisions() {
        assert_eq!(Decision::parse("accepted").unwrap(), Decision::Accept);
        assert_eq!(Decision::parse("rejected").unwrap(), Decision::Reject);
        assert!(matches!(
            Decision::parse("pending"),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            Decision::parse("approved"),
            Err(ServiceError::Validation(_))
        ));
        assert!(Decision::parse("Accepted").is_err());
    }

    #[test]
    fn decisions_map_to_statuses() {
        assert_eq!(Decision::Accept.status().as_str(), "accepted");
        assert_eq!(Decision::Reject.status().to_string(), "rejected");
    }
}
