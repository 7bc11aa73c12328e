use chrono::NaiveDateTime;
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{self, MIN_PASSWORD_LENGTH};
use crate::error::{ServiceError, ServiceResult};
use crate::identity::{Role, SubscriptionTier};
use crate::models::{NewUser, User};
use crate::schema::users;
use crate::utils::json::{classify_array, NullableValue};
use crate::utils::time::serialize_iso;

const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub subscription_tier: Option<String>,
    pub is_verified: bool,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub specialty: Option<String>,
    pub specialties: Value,
    pub experiences: Value,
    pub location: Option<String>,
    pub registration: Option<String>,
    #[serde(serialize_with = "serialize_iso")]
    pub created_at: NaiveDateTime,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            subscription_tier: user.subscription_tier,
            is_verified: user.is_verified,
            avatar_url: user.avatar_url,
            phone: user.phone,
            bio: user.bio,
            specialty: user.specialty,
            specialties: user.specialties,
            experiences: user.experiences,
            location: user.location,
            registration: user.registration,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub phone: Option<String>,
    pub registration: Option<String>,
    pub location: Option<String>,
    pub specialty: Option<String>,
    pub specialties: Option<Value>,
    pub experiences: Option<Value>,
}

pub fn normalize_email(raw: &str) -> ServiceResult<String> {
    let email = raw.trim().to_lowercase();
    let well_formed = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !well_formed {
        return Err(ServiceError::validation("a valid email is required"));
    }
    Ok(email)
}

pub fn check_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn profile_list(field: &str, value: Option<&Value>) -> ServiceResult<Value> {
    match classify_array(value).map_err(|err| ServiceError::validation(format!("{field}: {err}")))? {
        NullableValue::Present(list) => Ok(list),
        NullableValue::Omitted | NullableValue::Null => Ok(Value::Array(Vec::new())),
    }
}

fn email_taken(conn: &mut PgConnection, email: &str) -> QueryResult<bool> {
    diesel::select(exists(users::table.filter(users::email.eq(email)))).get_result(conn)
}

/// Creates a doctor, nurse or hospital account. Admins are provisioned out of band.
pub fn register(conn: &mut PgConnection, registration: Registration) -> ServiceResult<User> {
    let name = registration.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("name is required"));
    }
    let email = normalize_email(&registration.email)?;
    check_password(&registration.password)?;

    let role: Role = registration
        .role
        .trim()
        .parse()
        .map_err(|_| ServiceError::validation("role must be one of doctor, nurse or hospital"))?;
    if role == Role::Admin {
        return Err(ServiceError::validation(
            "role must be one of doctor, nurse or hospital",
        ));
    }

    let specialties = profile_list("specialties", registration.specialties.as_ref())?;
    let experiences = profile_list("experiences", registration.experiences.as_ref())?;

    if email_taken(conn, &email)? {
        return Err(ServiceError::Conflict("email already registered".to_string()));
    }

    let password_hash = password::hash_password(&registration.password)?;
    let subscription_tier =
        (role == Role::Hospital).then(|| SubscriptionTier::Free.as_str().to_string());

    let user = diesel::insert_into(users::table)
        .values(&NewUser {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role: role.as_str().to_string(),
            subscription_tier,
            phone: optional_text(registration.phone),
            specialty: optional_text(registration.specialty),
            specialties,
            experiences,
            location: optional_text(registration.location),
            registration: optional_text(registration.registration),
        })
        .returning(User::as_returning())
        .get_result(conn)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ServiceError::Conflict("email already registered".to_string())
            }
            other => ServiceError::Database(other),
        })?;

    info!(user_id = %user.id, role = %user.role, "account registered");
    Ok(user)
}

/// Checks an email/password pair. Unknown emails and wrong passwords fail the same way.
pub fn authenticate(conn: &mut PgConnection, email: &str, password: &str) -> ServiceResult<User> {
    let email = email.trim().to_lowercase();
    let user = users::table
        .filter(users::email.eq(&email))
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::Authentication(INVALID_CREDENTIALS.to_string()))?;

    let valid = password::verify_password(password, &user.password_hash).unwrap_or_else(|err| {
        warn!(user_id = %user.id, error = %err, "stored password hash is unreadable");
        false
    });
    if !valid {
        return Err(ServiceError::Authentication(INVALID_CREDENTIALS.to_string()));
    }
    Ok(user)
}

pub fn find_user(conn: &mut PgConnection, user_id: Uuid) -> ServiceResult<User> {
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("user not found"))
}
