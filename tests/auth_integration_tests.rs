use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Method, Request, StatusCode, Uri, header, request::Parts},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use course_trace_api::{
    ApiError, AppConfig, AppState, InMemoryRepository, MemoryStorageService,
    auth::{self, AuthUser},
    models::User,
    repository::UserRepository,
};
use std::sync::Arc;
use uuid::Uuid;

// --- Helper Functions ---

const ALICE_PASSWORD: &str = "correct horse";

async fn seeded_repo() -> (Arc<InMemoryRepository>, User) {
    let repo = Arc::new(InMemoryRepository::new());
    let now = Utc::now();
    let alice = User {
        id: Uuid::new_v4(),
        username: "alice".to_string(),
        password_hash: auth::hash_password(ALICE_PASSWORD).unwrap(),
        first_name: "Alice".to_string(),
        last_name: "Liddell".to_string(),
        account_created: now,
        account_updated: now,
    };
    repo.create_user(alice.clone()).await.unwrap();
    (repo, alice)
}

fn create_app_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState {
        repo,
        storage: Arc::new(MemoryStorageService::new()),
        config: AppConfig::default(),
    }
}

fn get_request_parts(authorization: Option<&str>) -> Parts {
    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/".parse::<Uri>().unwrap())
        .body(axum::body::Body::empty())
        .unwrap();
    if let Some(value) = authorization {
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    }
    let (parts, _) = request.into_parts();
    parts
}

fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_credentials() {
    let (repo, alice) = seeded_repo().await;
    let state = create_app_state(repo);

    let mut parts = get_request_parts(Some(&basic("alice", ALICE_PASSWORD)));
    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(user.id, alice.id);
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let (repo, _) = seeded_repo().await;
    let state = create_app_state(repo);

    let mut parts = get_request_parts(None);
    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::MissingCredentials));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_bearer_scheme() {
    let (repo, _) = seeded_repo().await;
    let state = create_app_state(repo);

    let mut parts = get_request_parts(Some("Bearer some.jwt.token"));
    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::MalformedCredentials));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
    let (repo, _) = seeded_repo().await;
    let state = create_app_state(repo);

    let mut wrong_password = get_request_parts(Some(&basic("alice", "wrong")));
    let mut unknown_user = get_request_parts(Some(&basic("mallory", ALICE_PASSWORD)));

    let a = AuthUser::from_request_parts(&mut wrong_password, &state)
        .await
        .unwrap_err();
    let b = AuthUser::from_request_parts(&mut unknown_user, &state)
        .await
        .unwrap_err();

    assert!(matches!(a, ApiError::InvalidCredentials));
    assert!(matches!(b, ApiError::InvalidCredentials));
    assert_eq!(a.public_message(), b.public_message());
}

#[tokio::test]
async fn test_extractor_reuses_identity_from_extensions() {
    let (repo, _) = seeded_repo().await;
    let state = create_app_state(repo);

    // No header at all: the identity attached by the middleware must be used as-is.
    let mut parts = get_request_parts(None);
    let attached = AuthUser {
        id: Uuid::new_v4(),
        username: "already-resolved".to_string(),
    };
    parts.extensions.insert(attached.clone());

    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(user, attached);
}

#[tokio::test]
async fn test_verify_credentials_returns_stored_user() {
    let (repo, alice) = seeded_repo().await;

    let user = auth::verify_credentials(repo.as_ref(), "alice", ALICE_PASSWORD)
        .await
        .unwrap();
    assert_eq!(user.id, alice.id);

    let err = auth::verify_credentials(repo.as_ref(), "alice", "")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials));
}
