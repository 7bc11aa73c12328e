use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

pub mod admin;
pub mod applications;
pub mod auth;
pub mod documents;
pub mod extract;
pub mod health;
pub mod jobs;
pub mod messages;
pub mod uploads;
pub mod users;

fn cors_layer(allowed: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(err) => {
                        warn!(origin = value, error = %err, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());
    let body_limit = state.config.upload_max_bytes;

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let jobs_routes = Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::create_job))
        .route("/my-jobs", get(jobs::list_my_jobs))
        .route("/:id/close", patch(jobs::close_job));

    let applications_routes = Router::new()
        .route("/apply", post(applications::apply))
        .route("/my-applications", get(applications::list_my_applications))
        .route("/job/:job_id", get(applications::list_job_applications))
        .route("/:id/status", patch(applications::update_status));

    let messages_routes = Router::new()
        .route("/", post(messages::send_message))
        .route("/contacts", get(messages::list_contacts))
        .route("/:other_user_id", get(messages::history))
        .route("/:other_user_id/read", post(messages::mark_read));

    let documents_routes = Router::new()
        .route("/upload", post(documents::upload_document))
        .route("/mine", get(documents::list_mine))
        .route("/sent", get(documents::list_sent))
        .route("/my-employees", get(documents::list_my_employees));

    let users_routes = Router::new()
        .route("/me", get(users::get_me).put(users::update_me))
        .route("/me/avatar", post(users::upload_avatar));

    let admin_routes = Router::new().route("/users/:id", patch(admin::update_user));

    Router::new()
        .route("/api/health", get(health::health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/jobs", jobs_routes)
        .nest("/api/applications", applications_routes)
        .nest("/api/messages", messages_routes)
        .nest("/api/documents", documents_routes)
        .nest("/api/users", users_routes)
        .nest("/api/admin", admin_routes)
        .route("/uploads/*key", get(uploads::serve_upload))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
}
