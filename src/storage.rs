use async_trait::async_trait;
use aws_sdk_s3 as s3;
use bytes::Bytes;
use s3::primitives::ByteStream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// StorageError
///
/// Failures reported by the blob store. The coordinator maps these onto the
/// `BlobWriteFailed` / `BlobDeleteFailed` API errors after logging the detail.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("blob write failed: {0}")]
    Write(String),
    #[error("blob read failed: {0}")]
    Read(String),
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("blob delete failed: {0}")]
    Delete(String),
}

// 1. StorageService Contract
/// StorageService
///
/// Abstract contract for the external blob store holding trace bytes. Swapping the
/// concrete implementation (S3/MinIO in production, in-memory in tests) does not
/// affect the coordinator or the handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Only called in the `Env::Local` setup.
    async fn ensure_bucket_exists(&self);

    /// Writes `body` under `key` and returns the object's location URI once the
    /// store has acknowledged the write.
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError>;

    async fn get_object(&self, key: &str) -> Result<Bytes, StorageError>;

    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// `{endpoint}/{bucket}`: every location handed out starts with this.
    fn location_prefix(&self) -> String;

    fn object_location(&self, key: &str) -> String {
        format!("{}/{}", self.location_prefix(), key)
    }

    /// Recovers the object key from a stored location.
    fn object_key(&self, location: &str) -> String {
        key_from_location(&self.location_prefix(), location)
    }
}

/// key_from_location
///
/// Strips the store's own prefix so keys containing `/` survive the round trip.
/// Locations from a foreign prefix fall back to their last path segment.
pub fn key_from_location(prefix: &str, location: &str) -> String {
    let own = format!("{}/", prefix.trim_end_matches('/'));
    match location.strip_prefix(&own) {
        Some(key) => key.to_string(),
        None => location
            .rsplit('/')
            .next()
            .unwrap_or(location)
            .to_string(),
    }
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// The concrete implementation using the AWS SDK for S3. `force_path_style(true)`
/// keeps it compatible with MinIO and other S3 gateways, and makes locations take
/// the `{endpoint}/{bucket}/{key}` form.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    endpoint: String,
    bucket_name: String,
}

impl S3StorageClient {
    /// new
    ///
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// CreateBucket on an existing bucket fails harmlessly; the result is only logged.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;

        Ok(self.object_location(key))
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Read(e.to_string())
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Read(e.to_string()))?;

        Ok(data.into_bytes())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete(e.to_string()))?;
        Ok(())
    }

    fn location_prefix(&self) -> String {
        format!("{}/{}", self.endpoint, self.bucket_name)
    }
}

// 3. The In-Memory Implementation (For Tests)
/// MemoryStorageService
///
/// An in-memory blob store used by the integration tests. It keeps the bytes it is
/// given so upload-then-fetch can be checked, and exposes switches that make writes
/// or deletes fail to simulate a store outage.
pub struct MemoryStorageService {
    objects: Mutex<HashMap<String, Bytes>>,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MemoryStorageService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorageService {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// A store on which every write and delete fails.
    pub fn new_failing() -> Self {
        let store = Self::new();
        store.set_fail_writes(true);
        store.set_fail_deletes(true);
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.objects).contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }
}

#[async_trait]
impl StorageService for MemoryStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write(
                "Memory Storage Error: Simulation requested".to_string(),
            ));
        }
        lock(&self.objects).insert(key.to_string(), body);
        Ok(self.object_location(key))
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, StorageError> {
        lock(&self.objects)
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Delete(
                "Memory Storage Error: Simulation requested".to_string(),
            ));
        }
        // Deleting a missing key succeeds, as it does on S3.
        lock(&self.objects).remove(key);
        Ok(())
    }

    fn location_prefix(&self) -> String {
        "memory://traces".to_string()
    }
}

/// StorageState
///
/// The concrete type used to share the storage service access across the application state.
pub type StorageState = Arc<dyn StorageService>;
