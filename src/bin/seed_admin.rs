use std::env;

use anyhow::{bail, Context, Result};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use medhub::{
    accounts::{check_password, normalize_email},
    auth::password::hash_password,
    db, init_tracing,
    identity::Role,
    models::NewUser,
    schema::users,
};

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let email = env::var("ADMIN_EMAIL").context("ADMIN_EMAIL must be set")?;
    let password = env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set")?;
    let name = env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());

    let email = normalize_email(&email).map_err(|err| anyhow::anyhow!("ADMIN_EMAIL: {err}"))?;
    if let Err(err) = check_password(&password) {
        bail!("ADMIN_PASSWORD: {err}");
    }

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    tracing::info!(component = "seed_admin", %email, "seeding admin account");
    let pool = db::init_pool_with_size(&database_url, 1)?;
    let mut conn = db::checkout(&pool)?;
    db::run_migrations(&mut conn)?;

    let existing: Option<Uuid> = users::table
        .filter(users::email.eq(&email))
        .select(users::id)
        .first(&mut conn)
        .optional()
        .context("failed to look up admin account")?;
    if let Some(id) = existing {
        tracing::info!(user_id = %id, %email, "admin account already exists");
        return Ok(());
    }

    let id = Uuid::new_v4();
    diesel::insert_into(users::table)
        .values(&NewUser {
            id,
            name,
            email: email.clone(),
            password_hash: hash_password(&password)?,
            role: Role::Admin.as_str().to_string(),
            subscription_tier: None,
            phone: None,
            specialty: None,
            specialties: Value::Array(Vec::new()),
            experiences: Value::Array(Vec::new()),
            location: None,
            registration: None,
        })
        .execute(&mut conn)
        .context("failed to insert admin account")?;

    tracing::info!(user_id = %id, %email, "admin account created");
    Ok(())
}
