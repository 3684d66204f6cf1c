use super::{
    CourseRepository, InstructorRepository, RepoResult, TraceRepository, UserRepository,
    UserUpdate,
};
use crate::models::{Course, CourseRequest, Instructor, PatchCourseRequest, Trace, User};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::error::{DatabaseError, ErrorKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// InMemoryRepository
///
/// A process-local implementation of every resource repository, used by the
/// integration tests to drive handlers without a Postgres instance.
///
/// The `fail_*` switches simulate metadata-store outages so the coordinator's
/// partial-failure paths can be exercised.
#[derive(Default)]
pub struct InMemoryRepository {
    users: Mutex<HashMap<Uuid, User>>,
    instructors: Mutex<HashMap<Uuid, Instructor>>,
    courses: Mutex<HashMap<Uuid, Course>>,
    traces: Mutex<Vec<Trace>>,
    fail_trace_inserts: AtomicBool,
    fail_trace_deletes: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn simulated_outage() -> sqlx::Error {
    sqlx::Error::PoolTimedOut
}

/// Mirrors the driver error Postgres raises on a unique index, so `ApiError::from_constraint`
/// classifies both stores alike.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UniqueViolation(String);

impl UniqueViolation {
    fn error(message: String) -> sqlx::Error {
        sqlx::Error::Database(Box::new(Self(message)))
    }
}

impl DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        &self.0
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::UniqueViolation
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `create_trace` fail.
    pub fn set_fail_trace_inserts(&self, fail: bool) {
        self.fail_trace_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `delete_trace` fail.
    pub fn set_fail_trace_deletes(&self, fail: bool) {
        self.fail_trace_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn course_count(&self) -> usize {
        lock(&self.courses).len()
    }

    pub fn trace_count(&self) -> usize {
        lock(&self.traces).len()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn create_user(&self, user: User) -> RepoResult<User> {
        let mut users = lock(&self.users);
        if users.values().any(|u| u.username == user.username) {
            return Err(UniqueViolation::error(format!(
                "duplicate username: {}",
                user.username
            )));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(lock(&self.users).get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(lock(&self.users)
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_user(&self, id: Uuid, changes: UserUpdate) -> RepoResult<Option<User>> {
        let mut users = lock(&self.users);
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        user.account_updated = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        Ok(lock(&self.users).remove(&id).is_some())
    }
}

#[async_trait]
impl InstructorRepository for InMemoryRepository {
    async fn create_instructor(&self, instructor: Instructor) -> RepoResult<Instructor> {
        lock(&self.instructors).insert(instructor.instructor_id, instructor.clone());
        Ok(instructor)
    }

    async fn get_instructor(&self, id: Uuid) -> RepoResult<Option<Instructor>> {
        Ok(lock(&self.instructors).get(&id).cloned())
    }

    async fn instructor_exists(&self, id: Uuid) -> RepoResult<bool> {
        Ok(lock(&self.instructors).contains_key(&id))
    }

    async fn update_instructor(&self, id: Uuid, name: String) -> RepoResult<Option<Instructor>> {
        Ok(lock(&self.instructors).get_mut(&id).map(|instructor| {
            instructor.name = name;
            instructor.clone()
        }))
    }

    async fn delete_instructor(&self, id: Uuid) -> RepoResult<bool> {
        Ok(lock(&self.instructors).remove(&id).is_some())
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn create_course(&self, course: Course) -> RepoResult<Course> {
        lock(&self.courses).insert(course.course_id, course.clone());
        Ok(course)
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        Ok(lock(&self.courses).get(&id).cloned())
    }

    async fn update_course(&self, id: Uuid, req: CourseRequest) -> RepoResult<Option<Course>> {
        Ok(lock(&self.courses).get_mut(&id).map(|course| {
            course.code = req.code;
            course.name = req.name;
            course.description = req.description;
            course.semester_term = req.semester_term;
            course.manufacturer = req.manufacturer;
            course.credit_hours = req.credit_hours;
            course.semester_year = req.semester_year;
            course.instructor_id = req.instructor_id;
            course.date_last_updated = Utc::now();
            course.clone()
        }))
    }

    async fn patch_course(
        &self,
        id: Uuid,
        req: PatchCourseRequest,
    ) -> RepoResult<Option<Course>> {
        Ok(lock(&self.courses).get_mut(&id).map(|course| {
            if let Some(code) = req.code {
                course.code = code;
            }
            if let Some(name) = req.name {
                course.name = name;
            }
            if let Some(description) = req.description {
                course.description = description;
            }
            if let Some(semester_term) = req.semester_term {
                course.semester_term = semester_term;
            }
            if let Some(manufacturer) = req.manufacturer {
                course.manufacturer = manufacturer;
            }
            if let Some(credit_hours) = req.credit_hours {
                course.credit_hours = credit_hours;
            }
            if let Some(semester_year) = req.semester_year {
                course.semester_year = semester_year;
            }
            if let Some(instructor_id) = req.instructor_id {
                course.instructor_id = instructor_id;
            }
            course.date_last_updated = Utc::now();
            course.clone()
        }))
    }

    async fn delete_course(&self, id: Uuid) -> RepoResult<bool> {
        Ok(lock(&self.courses).remove(&id).is_some())
    }
}

#[async_trait]
impl TraceRepository for InMemoryRepository {
    async fn create_trace(&self, trace: Trace) -> RepoResult<Trace> {
        if self.fail_trace_inserts.load(Ordering::SeqCst) {
            return Err(simulated_outage());
        }
        lock(&self.traces).push(trace.clone());
        Ok(trace)
    }

    async fn get_trace(&self, course_id: Uuid, trace_id: Uuid) -> RepoResult<Option<Trace>> {
        Ok(lock(&self.traces)
            .iter()
            .find(|t| t.course_id == course_id && t.trace_id == trace_id)
            .cloned())
    }

    async fn list_traces(&self, course_id: Uuid) -> RepoResult<Vec<Trace>> {
        Ok(lock(&self.traces)
            .iter()
            .filter(|t| t.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn delete_trace(&self, course_id: Uuid, trace_id: Uuid) -> RepoResult<bool> {
        if self.fail_trace_deletes.load(Ordering::SeqCst) {
            return Err(simulated_outage());
        }
        let mut traces = lock(&self.traces);
        let before = traces.len();
        traces.retain(|t| !(t.course_id == course_id && t.trace_id == trace_id));
        Ok(traces.len() < before)
    }
}
