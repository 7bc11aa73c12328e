pub mod access;
pub mod accounts;
pub mod applications;
pub mod auth;
pub mod config;
pub mod contacts;
pub mod db;
pub mod documents;
pub mod error;
pub mod identity;
pub mod jobs;
pub mod messages;
pub mod models;
pub mod profiles;
pub mod routes;
pub mod schema;
pub mod state;
pub mod storage;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
