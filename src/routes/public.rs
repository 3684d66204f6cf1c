use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints needing no `Authorization` header.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe; does not touch either store.
        .route("/health", get(|| async { "ok" }))
        // POST /user
        // Registration. The only way an identity comes into existence.
        .route("/user", post(handlers::users::create_user))
        // GET /course/{id}
        .route("/course/{id}", get(handlers::courses::get_course))
        // GET /instructor/{id}
        .route("/instructor/{id}", get(handlers::instructors::get_instructor))
}
