mod access;
mod auth;
mod events;
mod licenses;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::server::AppState;
use crate::server::response::ApiError;

async fn not_found() -> ApiError {
    ApiError::not_found("Endpoint not found")
}

/// Routes mounted under `/api`. Every request passes the tenant header check first.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Session routes
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // User routes
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            put(users::update_user).delete(users::delete_user),
        )
        // Event routes
        .route(
            "/events",
            get(events::list_events)
                .post(events::create_event)
                .delete(events::clear_events),
        )
        .route("/events/bulk", post(events::bulk_create_events))
        .route("/events/export", get(events::export_events))
        .route(
            "/events/{id}",
            put(events::update_event).delete(events::delete_event),
        )
        // License routes
        .route(
            "/licenses",
            get(licenses::list_licenses).post(licenses::create_license),
        )
        .route(
            "/licenses/generate",
            get(licenses::preview_generated).post(licenses::generate_license),
        )
        .route("/licenses/preview-serial", get(licenses::preview_serial))
        .route("/licenses/check", post(licenses::check_license))
        .route(
            "/licenses/{id}",
            put(licenses::update_license).delete(licenses::delete_license),
        )
        .fallback(not_found)
}
