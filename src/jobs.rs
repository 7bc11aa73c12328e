use chrono::{NaiveDate, NaiveTime};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::access::{owned_job, require_hospital};
use crate::error::{ServiceError, ServiceResult, LIMIT_REACHED};
use crate::identity::{Actor, SubscriptionTier};
use crate::models::{Job, NewJob};
use crate::schema::{jobs, users};
use crate::utils::time::parse_clock;

pub const STATUS_OPEN: &str = "open";
pub const STATUS_CLOSED: &str = "closed";

const FREE_PLAN_LIMIT_MESSAGE: &str =
    "free plan limit reached (1 open job). Upgrade your plan to post unlimited jobs.";

/// Job fields as submitted by a hospital, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobDraft {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

struct ValidJob {
    title: String,
    description: Option<String>,
    location: Option<String>,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

impl JobDraft {
    fn validate(self) -> ServiceResult<ValidJob> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ServiceError::validation("title must not be empty"));
        }
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| ServiceError::validation("date must be formatted as YYYY-MM-DD"))?;
        let start_time = parse_clock(&self.start_time)
            .ok_or_else(|| ServiceError::validation("start_time must be formatted as HH:MM"))?;
        // Overnight shifts end earlier on the clock than they start.
        let end_time = parse_clock(&self.end_time)
            .ok_or_else(|| ServiceError::validation("end_time must be formatted as HH:MM"))?;

        Ok(ValidJob {
            title: title.to_string(),
            description: non_blank(self.description),
            location: non_blank(self.location),
            date,
            start_time,
            end_time,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenJob {
    #[serde(flatten)]
    pub job: Job,
    pub hospital_name: String,
}

/// Posts a new open job. Free-plan hospitals are held to one open job; the
/// hospital row is locked so concurrent posts by the same account serialize.
pub fn create_job(conn: &mut PgConnection, actor: &Actor, draft: JobDraft) -> ServiceResult<Job> {
    require_hospital(actor)?;
    let fields = draft.validate()?;

    let job = conn.transaction::<_, ServiceError, _>(|conn| {
        let tier: Option<String> = users::table
            .find(actor.id)
            .select(users::subscription_tier)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found("hospital account not found"))?;
        let tier = SubscriptionTier::from_column(tier.as_deref());

        if let Some(limit) = tier.open_job_limit() {
            let open_jobs: i64 = jobs::table
                .filter(jobs::hospital_id.eq(actor.id))
                .filter(jobs::status.eq(STATUS_OPEN))
                .count()
                .get_result(conn)?;
            if open_jobs >= limit {
                info!(hospital_id = %actor.id, open_jobs, "job rejected by plan limit");
                return Err(ServiceError::QuotaExceeded {
                    message: FREE_PLAN_LIMIT_MESSAGE.to_string(),
                    code: LIMIT_REACHED,
                });
            }
        }

        let new_job = NewJob {
            id: Uuid::new_v4(),
            hospital_id: actor.id,
            title: fields.title,
            description: fields.description,
            location: fields.location,
            date: fields.date,
            start_time: fields.start_time,
            end_time: fields.end_time,
            status: STATUS_OPEN.to_string(),
        };

        diesel::insert_into(jobs::table)
            .values(&new_job)
            .execute(conn)?;

        Ok(jobs::table
            .find(new_job.id)
            .select(Job::as_select())
            .first(conn)?)
    })?;

    info!(job_id = %job.id, hospital_id = %actor.id, "job posted");
    Ok(job)
}

/// Open jobs from every hospital, soonest shift first.
pub fn list_open_jobs(conn: &mut PgConnection, _actor: &Actor) -> ServiceResult<Vec<OpenJob>> {
    let rows: Vec<(Job, String)> = jobs::table
        .inner_join(users::table)
        .filter(jobs::status.eq(STATUS_OPEN))
        .order((jobs::date.asc(), jobs::start_time.asc(), jobs::created_at.asc()))
        .select((Job::as_select(), users::name))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(job, hospital_name)| OpenJob { job, hospital_name })
        .collect())
}

pub fn list_my_jobs(conn: &mut PgConnection, actor: &Actor) -> ServiceResult<Vec<Job>> {
    require_hospital(actor)?;
    Ok(jobs::table
        .filter(jobs::hospital_id.eq(actor.id))
        .order(jobs::created_at.desc())
        .select(Job::as_select())
        .load(conn)?)
}

/// Closes one of the actor's jobs, freeing its plan slot. Closing twice is a no-op.
pub fn close_job(conn: &mut PgConnection, actor: &Actor, job_id: Uuid) -> ServiceResult<Job> {
    let job = owned_job(conn, actor, job_id)?;
    if job.status == STATUS_CLOSED {
        return Ok(job);
    }

    let closed = diesel::update(jobs::table.find(job.id))
        .set(jobs::status.eq(STATUS_CLOSED))
        .returning(Job::as_returning())
        .get_result(conn)?;

    info!(job_id = %closed.id, hospital_id = %actor.id, "job closed");
    Ok(closed)
}
