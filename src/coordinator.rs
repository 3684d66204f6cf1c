//! Artifact store coordinator.
//!
//! Keeps the blob store and the `traces` table in step. Both protocols touch the blob
//! store first and the metadata row second. A failure between the two steps can
//! therefore only leave an orphaned object with no row, which a sweep can find, and
//! never a row pointing at a missing object.

use axum::extract::FromRef;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::Trace,
    repository::RepositoryState,
    storage::{StorageError, StorageState},
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One file taken from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// The result for a single artifact of a multi-file upload.
#[derive(Debug)]
pub struct UploadOutcome {
    pub file_name: String,
    pub result: ApiResult<Trace>,
}

#[derive(Clone)]
pub struct ArtifactCoordinator {
    repo: RepositoryState,
    storage: StorageState,
}

impl FromRef<AppState> for ArtifactCoordinator {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.repo.clone(), state.storage.clone())
    }
}

/// object_name
///
/// `{unix nanos}-{random v4}-{client file name}`. The random segment keeps names
/// unguessable even when two uploads share a timestamp and a file name.
// TODO: the client file name is used unsanitized; decide whether `/` and `..` should be stripped.
pub fn object_name(file_name: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}-{}-{}", nanos, Uuid::new_v4().simple(), file_name)
}

impl ArtifactCoordinator {
    pub fn new(repo: RepositoryState, storage: StorageState) -> Self {
        Self { repo, storage }
    }

    /// upload
    ///
    /// Write the blob, then record it. The caller must have checked that `course_id`
    /// exists. A metadata failure leaves the blob in place: it is logged with its key
    /// and not rolled back.
    pub async fn upload(
        &self,
        owner: &AuthUser,
        course_id: Uuid,
        file: UploadedFile,
    ) -> ApiResult<Trace> {
        let key = object_name(&file.file_name);
        let content_type = file.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);

        let location = self
            .storage
            .put_object(&key, file.bytes, content_type)
            .await
            .map_err(|e| {
                tracing::error!(%course_id, object_key = %key, error = %e, "blob write failed");
                ApiError::BlobWriteFailed
            })?;

        let trace = Trace {
            trace_id: Uuid::new_v4(),
            course_id,
            user_id: owner.id,
            file_name: file.file_name,
            bucket_path: location,
            date_created: Utc::now(),
        };
        let trace_id = trace.trace_id;

        let trace = self.repo.create_trace(trace).await.map_err(|e| {
            tracing::error!(
                %course_id,
                %trace_id,
                object_key = %key,
                error = %e,
                "trace metadata insert failed, blob object orphaned"
            );
            ApiError::MetadataWriteFailed
        })?;

        tracing::info!(%course_id, trace_id = %trace.trace_id, object_key = %key, "trace uploaded");
        Ok(trace)
    }

    /// upload_all
    ///
    /// Processes files one after another. A failure is recorded against its own file
    /// and the remaining files are still attempted.
    pub async fn upload_all(
        &self,
        owner: &AuthUser,
        course_id: Uuid,
        files: Vec<UploadedFile>,
    ) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let file_name = file.file_name.clone();
            let result = self.upload(owner, course_id, file).await;
            outcomes.push(UploadOutcome { file_name, result });
        }
        outcomes
    }

    /// resolve
    ///
    /// Looks up a trace by (course, trace) id pair.
    pub async fn resolve(&self, course_id: Uuid, trace_id: Uuid) -> ApiResult<Trace> {
        self.repo
            .get_trace(course_id, trace_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Trace not found"))
    }

    /// delete
    ///
    /// Remove the blob, then the row. If the blob delete fails the row is kept, so the
    /// row still exists exactly when its object does, and the delete can be retried.
    pub async fn delete(&self, trace: Trace) -> ApiResult<Trace> {
        let (course_id, trace_id) = (trace.course_id, trace.trace_id);
        let key = self.storage.object_key(&trace.bucket_path);

        self.storage.delete_object(&key).await.map_err(|e| {
            tracing::error!(%course_id, %trace_id, object_key = %key, error = %e, "blob delete failed, metadata kept");
            ApiError::BlobDeleteFailed
        })?;

        match self.repo.delete_trace(course_id, trace_id).await {
            Ok(true) => {
                tracing::info!(%course_id, %trace_id, object_key = %key, "trace deleted");
                Ok(trace)
            }
            Ok(false) => {
                // Removed concurrently between lookup and delete; the object is gone too.
                tracing::warn!(%course_id, %trace_id, "trace row already removed");
                Ok(trace)
            }
            Err(e) => {
                tracing::error!(
                    %course_id,
                    %trace_id,
                    object_key = %key,
                    error = %e,
                    "trace metadata delete failed, row now dangling"
                );
                Err(ApiError::MetadataDeleteFailed)
            }
        }
    }

    /// fetch_content
    ///
    /// Reads a trace's object back from the blob store.
    pub async fn fetch_content(&self, trace: &Trace) -> ApiResult<Bytes> {
        let key = self.storage.object_key(&trace.bucket_path);
        match self.storage.get_object(&key).await {
            Ok(bytes) => Ok(bytes),
            Err(StorageError::NotFound(_)) => {
                tracing::warn!(course_id = %trace.course_id, trace_id = %trace.trace_id, object_key = %key, "trace row has no blob object");
                Err(ApiError::not_found("Trace content not found"))
            }
            Err(e) => Err(ApiError::Internal(e.to_string())),
        }
    }
}
