use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request, State},
    http::{HeaderName, StatusCode},
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;
pub mod storage;

// Routing split by access level (public, authenticated).
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth::AuthUser;
pub use config::AppConfig;
pub use coordinator::ArtifactCoordinator;
pub use error::{ApiError, ApiResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MemoryStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Generated OpenAPI document, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::create_user, handlers::users::get_user, handlers::users::update_user,
        handlers::users::delete_user,
        handlers::instructors::create_instructor, handlers::instructors::get_instructor,
        handlers::instructors::update_instructor, handlers::instructors::patch_instructor,
        handlers::instructors::delete_instructor,
        handlers::courses::create_course, handlers::courses::get_course,
        handlers::courses::update_course, handlers::courses::patch_course,
        handlers::courses::delete_course,
        handlers::traces::upload_traces, handlers::traces::list_traces,
        handlers::traces::get_trace, handlers::traces::get_trace_content,
        handlers::traces::delete_trace,
    ),
    components(
        schemas(
            models::Instructor, models::Course, models::Trace, models::UserResponse,
            models::CreateUserRequest, models::UpdateUserRequest,
            models::CreateInstructorRequest, models::PatchInstructorRequest,
            models::CourseRequest, models::PatchCourseRequest,
            models::InstructorDeleted, models::UploadFailure, models::UploadReport,
        )
    ),
    tags(
        (name = "course-trace-api", description = "Course, instructor and trace management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The shared, cheaply clonable container for every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    /// Metadata store for users, instructors, courses and traces.
    pub repo: RepositoryState,
    /// Blob store holding trace objects.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Resolves the caller's identity once per request from the Basic credentials and
/// attaches it to the request extensions. Any authentication failure short-circuits
/// with the matching 401 before the handler runs.
async fn auth_middleware(
    State(repo): State<RepositoryState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = auth::authenticate(repo.as_ref(), request.headers()).await?;
    tracing::debug!(user_id = %user.id, "request authenticated");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// create_router
///
/// Assembles routing, scoped and global middleware, and the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let body_limit = state.config.max_upload_bytes;
    let request_timeout = state.config.request_timeout;

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
                // Dropping the handler future on expiry also abandons its in-flight store calls.
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                )),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`; tags every log line of a request with its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
