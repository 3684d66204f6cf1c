use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Records (Mapped to Database) ---

/// User
///
/// The stored identity row from the `users` table. Carries the Argon2 hash, so it is
/// intentionally not `Serialize`: every response goes through `UserResponse`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub account_created: DateTime<Utc>,
    pub account_updated: DateTime<Utc>,
}

/// Instructor
///
/// A row from the `instructors` table. `user_id` is the identity that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Instructor {
    pub instructor_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub date_created: DateTime<Utc>,
}

/// Course
///
/// A row from the `courses` table. `owner_user_id` is captured once at creation from the
/// authenticated identity and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Course {
    pub course_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: String,
    pub semester_term: String,
    pub manufacturer: String,
    pub credit_hours: i32,
    pub semester_year: i32,
    #[ts(type = "string")]
    pub date_added: DateTime<Utc>,
    #[ts(type = "string")]
    pub date_last_updated: DateTime<Utc>,
    pub owner_user_id: Uuid,
    pub instructor_id: Uuid,
}

/// Trace
///
/// Metadata row for one uploaded artifact. `bucket_path` points at the blob object and
/// is generated server-side at upload time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Trace {
    pub trace_id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub bucket_path: String,
    #[ts(type = "string")]
    pub date_created: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateUserRequest
///
/// Input payload for registration (POST /user). The password is hashed before it
/// reaches the repository and is never echoed back.
#[derive(Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// UpdateUserRequest
///
/// Partial profile update (PUT /user/{id}). A new password is re-hashed.
#[derive(Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateInstructorRequest {
    pub name: String,
}

/// PatchInstructorRequest
///
/// Partial update payload (PATCH /instructor/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PatchInstructorRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// CourseRequest
///
/// Full course payload, used for POST /course and PUT /course/{id}.
/// Any `owner_user_id` sent by the client is ignored: it is not a field here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CourseRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub semester_term: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub credit_hours: i32,
    #[serde(default)]
    pub semester_year: i32,
    pub instructor_id: Uuid,
}

/// PatchCourseRequest
///
/// Partial update payload (PATCH /course/{id}). Only `Some` fields are written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PatchCourseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_hours: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<Uuid>,
}

// --- Response Schemas (Output) ---

/// UserResponse
///
/// The public view of a `User`. There is no secret field to leak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[ts(type = "string")]
    pub account_created: DateTime<Utc>,
    #[ts(type = "string")]
    pub account_updated: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            account_created: user.account_created,
            account_updated: user.account_updated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct InstructorDeleted {
    pub message: String,
    pub instructor_id: Uuid,
    pub name: String,
}

/// UploadFailure
///
/// One artifact of a multi-file upload that could not be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UploadFailure {
    pub file_name: String,
    pub error: String,
}

/// UploadReport
///
/// Body returned when at least one artifact of an upload failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UploadReport {
    pub created: Vec<Trace>,
    pub failed: Vec<UploadFailure>,
}
