use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::courses::load_course;
use crate::{
    AppState,
    auth::AuthUser,
    coordinator::{ArtifactCoordinator, UploadOutcome, UploadedFile},
    error::{ApiError, ApiResult},
    models::{Trace, UploadFailure, UploadReport},
    policy::{self, Action, Resource},
};

/// Multipart field carrying trace artifacts. It may repeat.
const FILE_FIELD: &str = "file";
const UNNAMED_FILE: &str = "unnamed";

/// Drains the multipart body, keeping every `file` field and ignoring the rest.
async fn read_files(mut multipart: Multipart) -> ApiResult<Vec<UploadedFile>> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or(UNNAMED_FILE).to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        files.push(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }
    Ok(files)
}

/// Folds per-file outcomes into one response: 201 when everything was stored, 207 when
/// only some were, and the first failure's status when none were.
pub fn upload_response(outcomes: Vec<UploadOutcome>) -> Response {
    let mut created = Vec::new();
    let mut failed = Vec::new();
    let mut first_failure = None;

    for outcome in outcomes {
        match outcome.result {
            Ok(trace) => created.push(trace),
            Err(e) => {
                first_failure.get_or_insert(e.status());
                failed.push(UploadFailure {
                    file_name: outcome.file_name,
                    error: e.public_message(),
                });
            }
        }
    }

    match first_failure {
        None => (StatusCode::CREATED, Json(created)).into_response(),
        Some(status) => {
            let status = if created.is_empty() {
                status
            } else {
                StatusCode::MULTI_STATUS
            };
            (status, Json(UploadReport { created, failed })).into_response()
        }
    }
}

/// upload_traces
///
/// [Authenticated Route] Stores each `file` part as a blob and records a trace row for it.
#[utoipa::path(
    post,
    path = "/course/{id}/trace",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body(content = String, content_type = "multipart/form-data", description = "One or more `file` parts"),
    responses(
        (status = 201, description = "All traces stored", body = [Trace]),
        (status = 207, description = "Some traces stored", body = UploadReport),
        (status = 400, description = "No file in request"),
        (status = 404, description = "Course not found"),
        (status = 413, description = "Body exceeds MAX_UPLOAD_BYTES"),
        (status = 500, description = "Blob or metadata store failure", body = UploadReport)
    )
)]
pub async fn upload_traces(
    auth_user: AuthUser,
    State(state): State<AppState>,
    State(coordinator): State<ArtifactCoordinator>,
    Path(course_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Response> {
    load_course(&state, course_id).await?;
    policy::ensure(&auth_user, Resource::NewTrace, Action::Create)?;

    let files = read_files(multipart).await?;
    if files.is_empty() {
        return Err(ApiError::bad_request("Missing file in request"));
    }

    let outcomes = coordinator.upload_all(&auth_user, course_id, files).await;
    Ok(upload_response(outcomes))
}

#[utoipa::path(
    get,
    path = "/course/{id}/trace",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Traces of the course", body = [Trace]),
        (status = 404, description = "Course not found")
    )
)]
pub async fn list_traces(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Trace>>> {
    load_course(&state, course_id).await?;
    Ok(Json(state.repo.list_traces(course_id).await?))
}

#[utoipa::path(
    get,
    path = "/course/{id}/trace/{trace_id}",
    params(
        ("id" = Uuid, Path, description = "Course ID"),
        ("trace_id" = Uuid, Path, description = "Trace ID")
    ),
    responses(
        (status = 200, description = "Found", body = Trace),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_trace(
    auth_user: AuthUser,
    State(coordinator): State<ArtifactCoordinator>,
    Path((course_id, trace_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Trace>> {
    let trace = coordinator.resolve(course_id, trace_id).await?;
    policy::ensure(&auth_user, Resource::Trace(&trace), Action::Read)?;
    Ok(Json(trace))
}

/// get_trace_content
///
/// [Authenticated Route] Returns the stored object as an octet stream.
#[utoipa::path(
    get,
    path = "/course/{id}/trace/{trace_id}/content",
    params(
        ("id" = Uuid, Path, description = "Course ID"),
        ("trace_id" = Uuid, Path, description = "Trace ID")
    ),
    responses(
        (status = 200, description = "Raw artifact bytes", body = [u8], content_type = "application/octet-stream"),
        (status = 404, description = "Trace or its object not found")
    )
)]
pub async fn get_trace_content(
    auth_user: AuthUser,
    State(coordinator): State<ArtifactCoordinator>,
    Path((course_id, trace_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Response> {
    let trace = coordinator.resolve(course_id, trace_id).await?;
    policy::ensure(&auth_user, Resource::Trace(&trace), Action::Read)?;

    let bytes = coordinator.fetch_content(&trace).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
}

/// delete_trace
///
/// [Authenticated Route] Blob first, then the row. A blob failure keeps the row.
#[utoipa::path(
    delete,
    path = "/course/{id}/trace/{trace_id}",
    params(
        ("id" = Uuid, Path, description = "Course ID"),
        ("trace_id" = Uuid, Path, description = "Trace ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 500, description = "Blob or metadata store failure")
    )
)]
pub async fn delete_trace(
    auth_user: AuthUser,
    State(coordinator): State<ArtifactCoordinator>,
    Path((course_id, trace_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let trace = coordinator.resolve(course_id, trace_id).await?;
    policy::ensure(&auth_user, Resource::Trace(&trace), Action::Delete)?;

    coordinator.delete(trace).await?;
    Ok(StatusCode::NO_CONTENT)
}
