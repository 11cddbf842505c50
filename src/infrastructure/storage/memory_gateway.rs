use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::ports::{ObjectMeta, ObjectStoreGateway, StorageError, UploadedPart};
use crate::domain::StorageKey;

#[derive(Default)]
struct MemoryState {
    objects: HashMap<String, Vec<u8>>,
    // upload_id -> key with the multipart session open
    uploads: HashMap<String, String>,
}

/// In-memory gateway with real multipart bookkeeping and fake presigned
/// URLs, so the orchestrator's idempotent-finalize policy can be exercised
/// without a storage backend.
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: place an object directly.
    pub fn seed_object(&self, key: &StorageKey, data: Vec<u8>) {
        self.state
            .lock()
            .expect("gateway lock")
            .objects
            .insert(key.as_str().to_string(), data);
    }

    /// Test hook: read an object back without going through the port.
    pub fn object(&self, key: &StorageKey) -> Option<Vec<u8>> {
        self.state
            .lock()
            .expect("gateway lock")
            .objects
            .get(key.as_str())
            .cloned()
    }
}

#[async_trait]
impl ObjectStoreGateway for MemoryGateway {
    async fn create_multipart_upload(&self, key: &StorageKey) -> Result<String, StorageError> {
        let upload_id = Uuid::new_v4().to_string();
        self.state
            .lock()
            .expect("gateway lock")
            .uploads
            .insert(upload_id.clone(), key.as_str().to_string());
        Ok(upload_id)
    }

    async fn presign_part_url(
        &self,
        key: &StorageKey,
        upload_id: &str,
        part_number: i32,
        _ttl: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!(
            "memory://{}?uploadId={}&partNumber={}",
            key, upload_id, part_number
        ))
    }

    async fn presign_get_url(
        &self,
        key: &StorageKey,
        _ttl: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!("memory://{}", key))
    }

    async fn complete_multipart_upload(
        &self,
        key: &StorageKey,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("gateway lock");
        match state.uploads.remove(upload_id) {
            Some(k) if k == key.as_str() => {
                // The part payloads were "uploaded" out of band; materialize a
                // placeholder object sized by part count.
                state
                    .objects
                    .insert(k, vec![0u8; parts.len().max(1)]);
                Ok(())
            }
            Some(k) => {
                state.uploads.insert(upload_id.to_string(), k);
                Err(StorageError::Backend(format!(
                    "upload {} does not match key {}",
                    upload_id, key
                )))
            }
            None => Err(StorageError::NotFound(format!(
                "no multipart upload {}",
                upload_id
            ))),
        }
    }

    async fn head_object(&self, key: &StorageKey) -> Result<Option<ObjectMeta>, StorageError> {
        Ok(self
            .state
            .lock()
            .expect("gateway lock")
            .objects
            .get(key.as_str())
            .map(|data| ObjectMeta {
                size: data.len() as u64,
            }))
    }

    async fn find_object(&self, prefix: &str) -> Result<Option<StorageKey>, StorageError> {
        Ok(self
            .state
            .lock()
            .expect("gateway lock")
            .objects
            .keys()
            .find(|k| k.starts_with(prefix))
            .map(StorageKey::from_raw))
    }

    async fn find_active_upload(
        &self,
        prefix: &str,
    ) -> Result<Option<(StorageKey, String)>, StorageError> {
        Ok(self
            .state
            .lock()
            .expect("gateway lock")
            .uploads
            .iter()
            .find(|(_, key)| key.starts_with(prefix))
            .map(|(upload_id, key)| (StorageKey::from_raw(key.clone()), upload_id.clone())))
    }

    async fn get_object(&self, key: &StorageKey) -> Result<Vec<u8>, StorageError> {
        self.state
            .lock()
            .expect("gateway lock")
            .objects
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put_object(&self, key: &StorageKey, data: Vec<u8>) -> Result<(), StorageError> {
        self.state
            .lock()
            .expect("gateway lock")
            .objects
            .insert(key.as_str().to_string(), data);
        Ok(())
    }
}
