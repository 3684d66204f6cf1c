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
    auth::{self, AuthUser},
    error::{ApiError, ApiResult},
    models::{CreateUserRequest, UpdateUserRequest, User, UserResponse},
    policy::{self, Action, Resource},
    repository::UserUpdate,
};

/// create_user
///
/// [Public Route] Registers a user. The password is stored only as an Argon2 hash.
#[utoipa::path(
    post,
    path = "/user",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Missing username or password"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    require_non_empty("username", &payload.username)?;
    require_non_empty("password", &payload.password)?;

    if state
        .repo
        .get_user_by_username(&payload.username)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        username: payload.username,
        password_hash: auth::hash_password(&payload.password)?,
        first_name: payload.first_name,
        last_name: payload.last_name,
        account_created: now,
        account_updated: now,
    };

    // The pre-check above can race with a concurrent registration; the unique index decides.
    let user = state
        .repo
        .create_user(user)
        .await
        .map_err(|e| ApiError::from_constraint(e, "User already exists"))?;

    tracing::info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// get_user
///
/// [Authenticated Route] Self only.
#[utoipa::path(
    get,
    path = "/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserResponse),
        (status = 403, description = "Not the caller's own record"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    policy::ensure(&auth_user, Resource::User(id), Action::Read)?;

    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse::from(user)))
}

/// update_user
///
/// [Authenticated Route] Self only. A supplied password is re-hashed.
#[utoipa::path(
    put,
    path = "/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 403, description = "Not the caller's own record"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    policy::ensure(&auth_user, Resource::User(id), Action::Update)?;

    let password_hash = match payload.password.as_deref() {
        Some(password) => {
            require_non_empty("password", password)?;
            Some(auth::hash_password(password)?)
        }
        None => None,
    };

    let changes = UserUpdate {
        first_name: payload.first_name,
        last_name: payload.last_name,
        password_hash,
    };

    let user = state
        .repo
        .update_user(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse::from(user)))
}

/// delete_user
///
/// [Authenticated Route] Self only. Refused with 409 while courses, instructors or
/// traces still reference the user.
#[utoipa::path(
    delete,
    path = "/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the caller's own record"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Still referenced")
    )
)]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    policy::ensure(&auth_user, Resource::User(id), Action::Delete)?;

    let deleted = state
        .repo
        .delete_user(id)
        .await
        .map_err(|e| ApiError::from_constraint(e, "User is still referenced by other records"))?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
