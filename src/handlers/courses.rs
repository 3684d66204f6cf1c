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
    models::{Course, CourseRequest, PatchCourseRequest},
    policy::{self, Action, Resource},
};

pub(crate) async fn load_course(state: &AppState, id: Uuid) -> ApiResult<Course> {
    state
        .repo
        .get_course(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))
}

/// The instructor referenced by a course must exist before the course row is written.
async fn ensure_instructor_exists(state: &AppState, instructor_id: Uuid) -> ApiResult<()> {
    if state.repo.instructor_exists(instructor_id).await? {
        Ok(())
    } else {
        Err(ApiError::InvalidReference(
            "Instructor does not exist".to_string(),
        ))
    }
}

fn validate_course(req: &CourseRequest) -> ApiResult<()> {
    require_non_empty("code", &req.code)?;
    require_non_empty("name", &req.name)?;
    if req.credit_hours < 0 {
        return Err(ApiError::bad_request("credit_hours must not be negative"));
    }
    Ok(())
}

/// create_course
///
/// [Authenticated Route] The caller becomes the course owner, regardless of the body.
#[utoipa::path(
    post,
    path = "/course",
    request_body = CourseRequest,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Invalid payload or unknown instructor")
    )
)]
pub async fn create_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CourseRequest>,
) -> ApiResult<(StatusCode, Json<Course>)> {
    policy::ensure(&auth_user, Resource::NewCourse, Action::Create)?;
    // An unknown instructor wins over field validation.
    ensure_instructor_exists(&state, payload.instructor_id).await?;
    validate_course(&payload)?;

    let now = Utc::now();
    let course = Course {
        course_id: Uuid::new_v4(),
        code: payload.code,
        name: payload.name,
        description: payload.description,
        semester_term: payload.semester_term,
        manufacturer: payload.manufacturer,
        credit_hours: payload.credit_hours,
        semester_year: payload.semester_year,
        date_added: now,
        date_last_updated: now,
        owner_user_id: auth_user.id,
        instructor_id: payload.instructor_id,
    };

    // Instructor deleted between the check and the insert.
    let course = state.repo.create_course(course).await.map_err(|e| {
        match ApiError::from_constraint(e, "Instructor does not exist") {
            ApiError::Conflict(msg) => ApiError::InvalidReference(msg),
            other => other,
        }
    })?;

    tracing::info!(course_id = %course.course_id, owner = %course.owner_user_id, "course created");
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get,
    path = "/course/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Found", body = Course),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Course>> {
    Ok(Json(load_course(&state, id).await?))
}

/// update_course
///
/// [Authenticated Route] Owner only. Replaces every mutable field.
#[utoipa::path(
    put,
    path = "/course/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CourseRequest,
    responses(
        (status = 200, description = "Updated", body = Course),
        (status = 400, description = "Invalid payload or unknown instructor"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourseRequest>,
) -> ApiResult<Json<Course>> {
    let existing = load_course(&state, id).await?;
    policy::ensure(&auth_user, Resource::Course(&existing), Action::Update)?;
    if payload.instructor_id != existing.instructor_id {
        ensure_instructor_exists(&state, payload.instructor_id).await?;
    }
    validate_course(&payload)?;

    let updated = state
        .repo
        .update_course(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    Ok(Json(updated))
}

/// patch_course
///
/// [Authenticated Route] Owner only. Only the supplied fields change.
#[utoipa::path(
    patch,
    path = "/course/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = PatchCourseRequest,
    responses(
        (status = 200, description = "Patched", body = Course),
        (status = 400, description = "Invalid payload or unknown instructor"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn patch_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PatchCourseRequest>,
) -> ApiResult<Json<Course>> {
    let existing = load_course(&state, id).await?;
    policy::ensure(&auth_user, Resource::Course(&existing), Action::Patch)?;

    if let Some(instructor_id) = payload
        .instructor_id
        .filter(|id| *id != existing.instructor_id)
    {
        ensure_instructor_exists(&state, instructor_id).await?;
    }
    if let Some(code) = payload.code.as_deref() {
        require_non_empty("code", code)?;
    }
    if let Some(name) = payload.name.as_deref() {
        require_non_empty("name", name)?;
    }
    if payload.credit_hours.is_some_and(|hours| hours < 0) {
        return Err(ApiError::bad_request("credit_hours must not be negative"));
    }

    let patched = state
        .repo
        .patch_course(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    Ok(Json(patched))
}

/// delete_course
///
/// [Authenticated Route] Owner only. Refused with 409 while traces remain.
#[utoipa::path(
    delete,
    path = "/course/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Course still has traces")
    )
)]
pub async fn delete_course(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let existing = load_course(&state, id).await?;
    policy::ensure(&auth_user, Resource::Course(&existing), Action::Delete)?;

    let deleted = state
        .repo
        .delete_course(id)
        .await
        .map_err(|e| ApiError::from_constraint(e, "Course still has traces"))?;
    if !deleted {
        return Err(ApiError::not_found("Course not found"));
    }

    tracing::info!(course_id = %id, "course deleted");
    Ok(StatusCode::NO_CONTENT)
}
