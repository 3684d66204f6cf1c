use crate::models::{Course, CourseRequest, Instructor, PatchCourseRequest, Trace, User};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Every persistence call surfaces the store error instead of swallowing it, so the
/// caller can tell "absent" (`Ok(None)` / `Ok(false)`) apart from "store failed" (`Err`).
pub type RepoResult<T> = Result<T, sqlx::Error>;

/// UserUpdate
///
/// Column changes for a profile update. `None` leaves the column untouched.
/// `password_hash` must already be hashed by the caller.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
}

// --- Resource Repositories ---

/// Persistence of identities. Consumed by the credential verifier and the user handlers.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: User) -> RepoResult<User>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn update_user(&self, id: Uuid, changes: UserUpdate) -> RepoResult<Option<User>>;
    /// Returns false when no row matched.
    async fn delete_user(&self, id: Uuid) -> RepoResult<bool>;
}

#[async_trait]
pub trait InstructorRepository: Send + Sync {
    async fn create_instructor(&self, instructor: Instructor) -> RepoResult<Instructor>;
    async fn get_instructor(&self, id: Uuid) -> RepoResult<Option<Instructor>>;
    /// Referential check run before a course insert or instructor change.
    async fn instructor_exists(&self, id: Uuid) -> RepoResult<bool>;
    async fn update_instructor(&self, id: Uuid, name: String) -> RepoResult<Option<Instructor>>;
    async fn delete_instructor(&self, id: Uuid) -> RepoResult<bool>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create_course(&self, course: Course) -> RepoResult<Course>;
    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>>;
    /// Full replacement of the mutable columns. Owner and id are never touched.
    async fn update_course(&self, id: Uuid, req: CourseRequest) -> RepoResult<Option<Course>>;
    /// Partial update via COALESCE; only `Some` fields are written.
    async fn patch_course(&self, id: Uuid, req: PatchCourseRequest)
    -> RepoResult<Option<Course>>;
    async fn delete_course(&self, id: Uuid) -> RepoResult<bool>;
}

/// Trace metadata rows. Blob objects are handled by the coordinator, never here.
#[async_trait]
pub trait TraceRepository: Send + Sync {
    async fn create_trace(&self, trace: Trace) -> RepoResult<Trace>;
    async fn get_trace(&self, course_id: Uuid, trace_id: Uuid) -> RepoResult<Option<Trace>>;
    async fn list_traces(&self, course_id: Uuid) -> RepoResult<Vec<Trace>>;
    async fn delete_trace(&self, course_id: Uuid, trace_id: Uuid) -> RepoResult<bool>;
}

/// Repository
///
/// The aggregate contract held in `AppState`. Anything implementing all four
/// resource repositories is a `Repository`.
pub trait Repository:
    UserRepository + InstructorRepository + CourseRepository + TraceRepository
{
}

impl<T> Repository for T where
    T: UserRepository + InstructorRepository + CourseRepository + TraceRepository
{
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;
