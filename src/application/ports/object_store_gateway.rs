use std::time::Duration;

use async_trait::async_trait;

use crate::domain::StorageKey;

/// ETag of one uploaded part, as reported by the storage backend to the
/// client that performed the part upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i32,
    pub e_tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: u64,
}

/// Thin client over the object storage backend: multipart-upload lifecycle,
/// presigned URLs and whole-object reads/writes. No business logic.
#[async_trait]
pub trait ObjectStoreGateway: Send + Sync {
    async fn create_multipart_upload(&self, key: &StorageKey) -> Result<String, StorageError>;

    async fn presign_part_url(
        &self,
        key: &StorageKey,
        upload_id: &str,
        part_number: i32,
        ttl: Duration,
    ) -> Result<String, StorageError>;

    async fn presign_get_url(
        &self,
        key: &StorageKey,
        ttl: Duration,
    ) -> Result<String, StorageError>;

    async fn complete_multipart_upload(
        &self,
        key: &StorageKey,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), StorageError>;

    /// `None` when the object does not exist.
    async fn head_object(&self, key: &StorageKey) -> Result<Option<ObjectMeta>, StorageError>;

    /// First object stored under `prefix`, if any.
    async fn find_object(&self, prefix: &str) -> Result<Option<StorageKey>, StorageError>;

    /// Recover an abandoned multipart session by listing in-flight uploads
    /// under `prefix`. Returns the exact key and upload id when one exists.
    async fn find_active_upload(
        &self,
        prefix: &str,
    ) -> Result<Option<(StorageKey, String)>, StorageError>;

    async fn get_object(&self, key: &StorageKey) -> Result<Vec<u8>, StorageError>;

    async fn put_object(&self, key: &StorageKey, data: Vec<u8>) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("presigning failed: {0}")]
    Presign(String),
}
