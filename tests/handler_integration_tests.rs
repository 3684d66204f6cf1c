use axum::{
    Json,
    body::to_bytes,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use course_trace_api::{
    ApiError, AppConfig, AppState, InMemoryRepository, MemoryStorageService,
    auth::AuthUser,
    coordinator::UploadOutcome,
    handlers,
    models::{
        CourseRequest, CreateInstructorRequest, PatchCourseRequest, Trace, UploadReport, User,
    },
    repository::UserRepository,
};
use std::sync::Arc;
use uuid::Uuid;

// --- Test State ---

fn test_state() -> (AppState, Arc<InMemoryRepository>) {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState {
        repo: repo.clone(),
        storage: Arc::new(MemoryStorageService::new()),
        config: AppConfig::default(),
    };
    (state, repo)
}

fn user(name: &str) -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        username: name.to_string(),
    }
}

fn course_request(instructor_id: Uuid) -> CourseRequest {
    CourseRequest {
        code: "CSE6200".to_string(),
        name: "Cloud Computing".to_string(),
        credit_hours: 4,
        semester_year: 2025,
        instructor_id,
        ..CourseRequest::default()
    }
}

async fn seed_instructor(state: &AppState, by: &AuthUser) -> Uuid {
    let (status, Json(instructor)) = handlers::instructors::create_instructor(
        by.clone(),
        State(state.clone()),
        Json(CreateInstructorRequest {
            name: "Dr. Hopper".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    instructor.instructor_id
}

// --- Course Handlers ---

#[tokio::test]
async fn test_create_course_sets_owner_from_identity() {
    let (state, _) = test_state();
    let alice = user("alice");
    let instructor_id = seed_instructor(&state, &alice).await;

    let (status, Json(course)) = handlers::courses::create_course(
        alice.clone(),
        State(state.clone()),
        Json(course_request(instructor_id)),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(course.owner_user_id, alice.id);
    assert_eq!(course.date_added, course.date_last_updated);
}

#[tokio::test]
async fn test_create_course_validation() {
    let (state, repo) = test_state();
    let alice = user("alice");
    let instructor_id = seed_instructor(&state, &alice).await;

    let mut blank = course_request(instructor_id);
    blank.code = "  ".to_string();
    let err = handlers::courses::create_course(alice.clone(), State(state.clone()), Json(blank))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));

    let err = handlers::courses::create_course(
        alice,
        State(state),
        Json(course_request(Uuid::new_v4())),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidReference(_)));
    assert_eq!(repo.course_count(), 0);
}

#[tokio::test]
async fn test_unknown_instructor_outranks_field_validation() {
    let (state, repo) = test_state();
    let alice = user("alice");

    let mut invalid = course_request(Uuid::new_v4());
    invalid.code = String::new();
    let err = handlers::courses::create_course(alice, State(state), Json(invalid))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidReference(_)));
    assert_eq!(repo.course_count(), 0);
}

#[tokio::test]
async fn test_patch_course_rejects_unknown_instructor() {
    let (state, _) = test_state();
    let alice = user("alice");
    let instructor_id = seed_instructor(&state, &alice).await;
    let (_, Json(course)) = handlers::courses::create_course(
        alice.clone(),
        State(state.clone()),
        Json(course_request(instructor_id)),
    )
    .await
    .unwrap();

    let err = handlers::courses::patch_course(
        alice.clone(),
        State(state.clone()),
        Path(course.course_id),
        Json(PatchCourseRequest {
            instructor_id: Some(Uuid::new_v4()),
            ..PatchCourseRequest::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let Json(stored) =
        handlers::courses::get_course(State(state), Path(course.course_id))
            .await
            .unwrap();
    assert_eq!(stored.instructor_id, instructor_id);
}

#[tokio::test]
async fn test_missing_course_is_not_found_before_forbidden() {
    let (state, _) = test_state();
    let err = handlers::courses::delete_course(user("bob"), State(state), Path(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

// --- User Handlers ---

#[tokio::test]
async fn test_user_handlers_check_ownership_before_lookup() {
    let (state, _) = test_state();
    // Bob asks for an id that is not his; the answer is 403 whether or not it exists.
    let err = handlers::users::get_user(user("bob"), State(state), Path(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_duplicate_username_in_store_maps_to_conflict() {
    let (_, repo) = test_state();
    let now = Utc::now();
    let account = |id| User {
        id,
        username: "alice".to_string(),
        password_hash: "hash".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        account_created: now,
        account_updated: now,
    };
    repo.create_user(account(Uuid::new_v4())).await.unwrap();

    // Same path the registration handler takes when two signups race past its pre-check.
    let err = repo.create_user(account(Uuid::new_v4())).await.unwrap_err();
    let err = ApiError::from_constraint(err, "User already exists");

    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(err.status(), StatusCode::CONFLICT);
}

// --- Upload Response Shaping ---

fn trace() -> Trace {
    Trace {
        trace_id: Uuid::new_v4(),
        course_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        file_name: "ok.log".to_string(),
        bucket_path: "memory://traces/1-a-ok.log".to_string(),
        date_created: Utc::now(),
    }
}

async fn report_of(response: axum::response::Response) -> UploadReport {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_partial_upload_is_multi_status() {
    let response = handlers::traces::upload_response(vec![
        UploadOutcome {
            file_name: "ok.log".to_string(),
            result: Ok(trace()),
        },
        UploadOutcome {
            file_name: "bad.log".to_string(),
            result: Err(ApiError::BlobWriteFailed),
        },
    ]);

    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    let report = report_of(response).await;
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].file_name, "bad.log");
    assert_eq!(report.failed[0].error, "Failed to write trace to blob store");
}

#[tokio::test]
async fn test_all_failed_upload_uses_first_failure_status() {
    let response = handlers::traces::upload_response(vec![
        UploadOutcome {
            file_name: "a.log".to_string(),
            result: Err(ApiError::MetadataWriteFailed),
        },
        UploadOutcome {
            file_name: "b.log".to_string(),
            result: Err(ApiError::BlobWriteFailed),
        },
    ]);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let report = report_of(response).await;
    assert!(report.created.is_empty());
    assert_eq!(report.failed.len(), 2);
}

#[tokio::test]
async fn test_all_stored_upload_is_created() {
    let response = handlers::traces::upload_response(vec![UploadOutcome {
        file_name: "ok.log".to_string(),
        result: Ok(trace()),
    }]);

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let traces: Vec<Trace> = serde_json::from_slice(&body).unwrap();
    assert_eq!(traces.len(), 1);
}
