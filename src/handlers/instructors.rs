use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use super::require_non_empty;
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{CreateInstructorRequest, Instructor, InstructorDeleted, PatchInstructorRequest},
    policy::{self, Action, Resource},
};

async fn load_instructor(state: &AppState, id: Uuid) -> ApiResult<Instructor> {
    state
        .repo
        .get_instructor(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Instructor not found"))
}

/// create_instructor
///
/// [Authenticated Route] The caller is recorded as `user_id`.
#[utoipa::path(
    post,
    path = "/instructor",
    request_body = CreateInstructorRequest,
    responses(
        (status = 201, description = "Instructor created", body = Instructor),
        (status = 400, description = "Missing name")
    )
)]
pub async fn create_instructor(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateInstructorRequest>,
) -> ApiResult<(StatusCode, Json<Instructor>)> {
    policy::ensure(&auth_user, Resource::NewInstructor, Action::Create)?;
    require_non_empty("name", &payload.name)?;

    let instructor = Instructor {
        instructor_id: Uuid::new_v4(),
        user_id: auth_user.id,
        name: payload.name,
        date_created: Utc::now(),
    };
    let instructor = state.repo.create_instructor(instructor).await?;

    tracing::info!(instructor_id = %instructor.instructor_id, "instructor created");
    Ok((StatusCode::CREATED, Json(instructor)))
}

#[utoipa::path(
    get,
    path = "/instructor/{id}",
    params(("id" = Uuid, Path, description = "Instructor ID")),
    responses(
        (status = 200, description = "Found", body = Instructor),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_instructor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Instructor>> {
    Ok(Json(load_instructor(&state, id).await?))
}

/// update_instructor
///
/// [Authenticated Route] Full replacement of the mutable fields.
#[utoipa::path(
    put,
    path = "/instructor/{id}",
    params(("id" = Uuid, Path, description = "Instructor ID")),
    request_body = CreateInstructorRequest,
    responses(
        (status = 200, description = "Updated", body = Instructor),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_instructor(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateInstructorRequest>,
) -> ApiResult<Json<Instructor>> {
    let existing = load_instructor(&state, id).await?;
    policy::ensure(&auth_user, Resource::Instructor(&existing), Action::Update)?;
    require_non_empty("name", &payload.name)?;

    let updated = state
        .repo
        .update_instructor(id, payload.name)
        .await?
        .ok_or_else(|| ApiError::not_found("Instructor not found"))?;
    Ok(Json(updated))
}

/// patch_instructor
///
/// [Authenticated Route] An empty body leaves the row untouched.
#[utoipa::path(
    patch,
    path = "/instructor/{id}",
    params(("id" = Uuid, Path, description = "Instructor ID")),
    request_body = PatchInstructorRequest,
    responses(
        (status = 200, description = "Patched", body = Instructor),
        (status = 404, description = "Not Found")
    )
)]
pub async fn patch_instructor(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PatchInstructorRequest>,
) -> ApiResult<Json<Instructor>> {
    let existing = load_instructor(&state, id).await?;
    policy::ensure(&auth_user, Resource::Instructor(&existing), Action::Patch)?;

    let Some(name) = payload.name else {
        return Ok(Json(existing));
    };
    require_non_empty("name", &name)?;

    let patched = state
        .repo
        .update_instructor(id, name)
        .await?
        .ok_or_else(|| ApiError::not_found("Instructor not found"))?;
    Ok(Json(patched))
}

/// delete_instructor
///
/// [Authenticated Route] Refused with 409 while a course still references the instructor.
#[utoipa::path(
    delete,
    path = "/instructor/{id}",
    params(("id" = Uuid, Path, description = "Instructor ID")),
    responses(
        (status = 200, description = "Deleted", body = InstructorDeleted),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Still referenced by a course")
    )
)]
pub async fn delete_instructor(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InstructorDeleted>> {
    let existing = load_instructor(&state, id).await?;
    policy::ensure(&auth_user, Resource::Instructor(&existing), Action::Delete)?;

    let deleted = state
        .repo
        .delete_instructor(id)
        .await
        .map_err(|e| ApiError::from_constraint(e, "Instructor is still referenced by a course"))?;
    if !deleted {
        return Err(ApiError::not_found("Instructor not found"));
    }

    tracing::info!(instructor_id = %id, "instructor deleted");
    Ok(Json(InstructorDeleted {
        message: "Instructor deleted successfully".to_string(),
        instructor_id: existing.instructor_id,
        name: existing.name,
    }))
}
