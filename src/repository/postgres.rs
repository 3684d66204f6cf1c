use super::{
    CourseRepository, InstructorRepository, RepoResult, TraceRepository, UserRepository,
    UserUpdate,
};
use crate::models::{Course, CourseRequest, Instructor, PatchCourseRequest, Trace, User};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgresRepository
///
/// The concrete implementation of the resource repositories, backed by PostgreSQL.
/// Queries are built at runtime and bound with parameters; no SQL is assembled from input.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn create_user(&self, user: User) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, password_hash, first_name, last_name, account_created, account_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, username, password_hash, first_name, last_name, account_created, account_updated
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.account_created)
        .bind(user.account_updated)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, first_name, last_name, account_created, account_updated FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, first_name, last_name, account_created, account_updated FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// update_user
    ///
    /// COALESCE keeps any column whose change is `None`.
    async fn update_user(&self, id: Uuid, changes: UserUpdate) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                password_hash = COALESCE($4, password_hash),
                account_updated = NOW()
            WHERE id = $1
            RETURNING id, username, password_hash, first_name, last_name, account_created, account_updated
            "#,
        )
        .bind(id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl InstructorRepository for PostgresRepository {
    async fn create_instructor(&self, instructor: Instructor) -> RepoResult<Instructor> {
        sqlx::query_as::<_, Instructor>(
            r#"
            INSERT INTO instructors (instructor_id, user_id, name, date_created)
            VALUES ($1, $2, $3, $4)
            RETURNING instructor_id, user_id, name, date_created
            "#,
        )
        .bind(instructor.instructor_id)
        .bind(instructor.user_id)
        .bind(&instructor.name)
        .bind(instructor.date_created)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_instructor(&self, id: Uuid) -> RepoResult<Option<Instructor>> {
        sqlx::query_as::<_, Instructor>(
            "SELECT instructor_id, user_id, name, date_created FROM instructors WHERE instructor_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn instructor_exists(&self, id: Uuid) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM instructors WHERE instructor_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_instructor(&self, id: Uuid, name: String) -> RepoResult<Option<Instructor>> {
        sqlx::query_as::<_, Instructor>(
            r#"
            UPDATE instructors SET name = $2 WHERE instructor_id = $1
            RETURNING instructor_id, user_id, name, date_created
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_instructor(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM instructors WHERE instructor_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl CourseRepository for PostgresRepository {
    async fn create_course(&self, course: Course) -> RepoResult<Course> {
        sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (
                course_id, code, name, description, semester_term, manufacturer,
                credit_hours, semester_year, date_added, date_last_updated,
                owner_user_id, instructor_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING course_id, code, name, description, semester_term, manufacturer,
                      credit_hours, semester_year, date_added, date_last_updated,
                      owner_user_id, instructor_id
            "#,
        )
        .bind(course.course_id)
        .bind(&course.code)
        .bind(&course.name)
        .bind(&course.description)
        .bind(&course.semester_term)
        .bind(&course.manufacturer)
        .bind(course.credit_hours)
        .bind(course.semester_year)
        .bind(course.date_added)
        .bind(course.date_last_updated)
        .bind(course.owner_user_id)
        .bind(course.instructor_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        sqlx::query_as::<_, Course>(
            r#"
            SELECT course_id, code, name, description, semester_term, manufacturer,
                   credit_hours, semester_year, date_added, date_last_updated,
                   owner_user_id, instructor_id
            FROM courses WHERE course_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_course(&self, id: Uuid, req: CourseRequest) -> RepoResult<Option<Course>> {
        sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET code = $2, name = $3, description = $4, semester_term = $5,
                manufacturer = $6, credit_hours = $7, semester_year = $8,
                instructor_id = $9, date_last_updated = NOW()
            WHERE course_id = $1
            RETURNING course_id, code, name, description, semester_term, manufacturer,
                      credit_hours, semester_year, date_added, date_last_updated,
                      owner_user_id, instructor_id
            "#,
        )
        .bind(id)
        .bind(req.code)
        .bind(req.name)
        .bind(req.description)
        .bind(req.semester_term)
        .bind(req.manufacturer)
        .bind(req.credit_hours)
        .bind(req.semester_year)
        .bind(req.instructor_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn patch_course(
        &self,
        id: Uuid,
        req: PatchCourseRequest,
    ) -> RepoResult<Option<Course>> {
        sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET code = COALESCE($2, code),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                semester_term = COALESCE($5, semester_term),
                manufacturer = COALESCE($6, manufacturer),
                credit_hours = COALESCE($7, credit_hours),
                semester_year = COALESCE($8, semester_year),
                instructor_id = COALESCE($9, instructor_id),
                date_last_updated = NOW()
            WHERE course_id = $1
            RETURNING course_id, code, name, description, semester_term, manufacturer,
                      credit_hours, semester_year, date_added, date_last_updated,
                      owner_user_id, instructor_id
            "#,
        )
        .bind(id)
        .bind(req.code)
        .bind(req.name)
        .bind(req.description)
        .bind(req.semester_term)
        .bind(req.manufacturer)
        .bind(req.credit_hours)
        .bind(req.semester_year)
        .bind(req.instructor_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_course(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM courses WHERE course_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl TraceRepository for PostgresRepository {
    async fn create_trace(&self, trace: Trace) -> RepoResult<Trace> {
        sqlx::query_as::<_, Trace>(
            r#"
            INSERT INTO traces (trace_id, course_id, user_id, file_name, bucket_path, date_created)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING trace_id, course_id, user_id, file_name, bucket_path, date_created
            "#,
        )
        .bind(trace.trace_id)
        .bind(trace.course_id)
        .bind(trace.user_id)
        .bind(&trace.file_name)
        .bind(&trace.bucket_path)
        .bind(trace.date_created)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_trace(&self, course_id: Uuid, trace_id: Uuid) -> RepoResult<Option<Trace>> {
        sqlx::query_as::<_, Trace>(
            r#"
            SELECT trace_id, course_id, user_id, file_name, bucket_path, date_created
            FROM traces WHERE course_id = $1 AND trace_id = $2
            "#,
        )
        .bind(course_id)
        .bind(trace_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_traces(&self, course_id: Uuid) -> RepoResult<Vec<Trace>> {
        sqlx::query_as::<_, Trace>(
            r#"
            SELECT trace_id, course_id, user_id, file_name, bucket_path, date_created
            FROM traces WHERE course_id = $1
            ORDER BY date_created ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn delete_trace(&self, course_id: Uuid, trace_id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM traces WHERE course_id = $1 AND trace_id = $2")
            .bind(course_id)
            .bind(trace_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
