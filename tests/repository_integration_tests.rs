//! Runs against a real Postgres. Needs `DATABASE_URL`; run with `cargo test -- --ignored`.

use chrono::Utc;
use course_trace_api::{
    ApiError,
    models::{Course, CourseRequest, Instructor, PatchCourseRequest, Trace, User},
    repository::{
        CourseRepository, InstructorRepository, PostgresRepository, TraceRepository,
        UserRepository, UserUpdate,
    },
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Usernames are unique per run so tests can share one database.
async fn create_test_user(repo: &PostgresRepository) -> User {
    let now = Utc::now();
    repo.create_user(User {
        id: Uuid::new_v4(),
        username: format!("user-{}", Uuid::new_v4().simple()),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        account_created: now,
        account_updated: now,
    })
    .await
    .expect("create user")
}

async fn create_test_course(repo: &PostgresRepository, owner: &User) -> (Instructor, Course) {
    let instructor = repo
        .create_instructor(Instructor {
            instructor_id: Uuid::new_v4(),
            user_id: owner.id,
            name: "Dr. Test".to_string(),
            date_created: Utc::now(),
        })
        .await
        .expect("create instructor");

    let now = Utc::now();
    let course = repo
        .create_course(Course {
            course_id: Uuid::new_v4(),
            code: "CSE6200".to_string(),
            name: "Cloud Computing".to_string(),
            description: "desc".to_string(),
            semester_term: "Fall".to_string(),
            manufacturer: "NEU".to_string(),
            credit_hours: 4,
            semester_year: 2025,
            date_added: now,
            date_last_updated: now,
            owner_user_id: owner.id,
            instructor_id: instructor.instructor_id,
        })
        .await
        .expect("create course");

    (instructor, course)
}

// --- Tests ---

#[tokio::test]
#[ignore]
async fn test_user_crud_and_unique_username() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;

    let by_name = repo
        .get_user_by_username(&user.username)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_name.id, user.id);

    let duplicate = repo
        .create_user(User {
            id: Uuid::new_v4(),
            ..user.clone()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        ApiError::from_constraint(duplicate, "taken"),
        ApiError::Conflict(_)
    ));

    let updated = repo
        .update_user(
            user.id,
            UserUpdate {
                first_name: Some("Renamed".to_string()),
                ..UserUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.first_name, "Renamed");
    assert_eq!(updated.last_name, "User");
    assert_eq!(updated.password_hash, user.password_hash);

    assert!(repo.delete_user(user.id).await.unwrap());
    assert!(repo.get_user(user.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_course_update_and_patch() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;
    let (instructor, course) = create_test_course(&repo, &owner).await;

    let patched = repo
        .patch_course(
            course.course_id,
            PatchCourseRequest {
                name: Some("Patched".to_string()),
                ..PatchCourseRequest::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(patched.name, "Patched");
    assert_eq!(patched.code, course.code);
    assert_eq!(patched.owner_user_id, owner.id);

    let updated = repo
        .update_course(
            course.course_id,
            CourseRequest {
                code: "CSE7000".to_string(),
                name: "Replaced".to_string(),
                instructor_id: instructor.instructor_id,
                ..CourseRequest::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.code, "CSE7000");
    assert_eq!(updated.credit_hours, 0);
    assert_eq!(updated.owner_user_id, owner.id);
    assert_eq!(updated.date_added, course.date_added);

    assert!(repo.update_course(Uuid::new_v4(), CourseRequest::default()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_referenced_rows_cannot_be_deleted() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;
    let (instructor, course) = create_test_course(&repo, &owner).await;

    let err = repo
        .delete_instructor(instructor.instructor_id)
        .await
        .unwrap_err();
    assert!(matches!(
        ApiError::from_constraint(err, "referenced"),
        ApiError::Conflict(_)
    ));

    let err = repo.delete_user(owner.id).await.unwrap_err();
    assert!(matches!(
        ApiError::from_constraint(err, "referenced"),
        ApiError::Conflict(_)
    ));

    assert!(repo.delete_course(course.course_id).await.unwrap());
    assert!(repo.delete_instructor(instructor.instructor_id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_trace_rows_are_scoped_to_their_course() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;
    let (_, course) = create_test_course(&repo, &owner).await;

    let trace = repo
        .create_trace(Trace {
            trace_id: Uuid::new_v4(),
            course_id: course.course_id,
            user_id: owner.id,
            file_name: "run.log".to_string(),
            bucket_path: "http://localhost:9000/course-traces/1-a-run.log".to_string(),
            date_created: Utc::now(),
        })
        .await
        .unwrap();

    assert_eq!(repo.list_traces(course.course_id).await.unwrap(), vec![trace.clone()]);
    assert!(
        repo.get_trace(Uuid::new_v4(), trace.trace_id)
            .await
            .unwrap()
            .is_none()
    );

    // A course with traces cannot be removed.
    let err = repo.delete_course(course.course_id).await.unwrap_err();
    assert!(matches!(
        ApiError::from_constraint(err, "has traces"),
        ApiError::Conflict(_)
    ));

    assert!(repo.delete_trace(course.course_id, trace.trace_id).await.unwrap());
    assert!(!repo.delete_trace(course.course_id, trace.trace_id).await.unwrap());
}
