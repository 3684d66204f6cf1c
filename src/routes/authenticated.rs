use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind the auth middleware applied in `create_router`.
/// Ownership is then decided per request by the policy, inside the handlers, after
/// the target row has been loaded.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Users (self only) ---
        .route(
            "/user/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        // --- Instructors ---
        .route("/instructor", post(handlers::instructors::create_instructor))
        .route(
            "/instructor/{id}",
            put(handlers::instructors::update_instructor)
                .patch(handlers::instructors::patch_instructor)
                .delete(handlers::instructors::delete_instructor),
        )
        // --- Courses (mutations are owner only) ---
        .route("/course", post(handlers::courses::create_course))
        .route(
            "/course/{id}",
            put(handlers::courses::update_course)
                .patch(handlers::courses::patch_course)
                .delete(handlers::courses::delete_course),
        )
        // --- Traces ---
        // POST uploads one or more multipart `file` parts: blob first, then the row.
        .route(
            "/course/{id}/trace",
            post(handlers::traces::upload_traces).get(handlers::traces::list_traces),
        )
        .route(
            "/course/{id}/trace/{trace_id}",
            get(handlers::traces::get_trace).delete(handlers::traces::delete_trace),
        )
        .route(
            "/course/{id}/trace/{trace_id}/content",
            get(handlers::traces::get_trace_content),
        )
}
