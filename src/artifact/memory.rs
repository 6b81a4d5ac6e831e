//! In-memory artifact store.
//!
//! Useful for testing and for running the catalogue without a writable disk.

use super::{check_key, object_key, ArtifactRecord, ArtifactStore, LinkSigner, RetentionPolicy};
use crate::error::{Result, ToolError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use tracing::{debug, error};

struct StoredObject {
    record: ArtifactRecord,
    bytes: Vec<u8>,
}

/// In-memory artifact store.
pub struct MemoryArtifactStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    signer: LinkSigner,
    policy: RetentionPolicy,
    available: AtomicBool,
    puts: AtomicUsize,
}

impl MemoryArtifactStore {
    pub fn new(signer: LinkSigner) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            signer,
            policy: RetentionPolicy::default(),
            available: AtomicBool::new(true),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn with_policy(mut self, policy: RetentionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Simulate the backing store going away.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `put` calls, successful or not.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store with an explicit write time.
    pub fn put_at(
        &self,
        category: &str,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            error!("In-memory artifact store is unavailable");
            return Err(ToolError::Storage(
                "artifact store is unavailable".to_string(),
            ));
        }

        let key = object_key(category, filename, now);
        let record = ArtifactRecord {
            key: key.clone(),
            content_type: content_type.to_string(),
            bytes_size: bytes.len() as u64,
            created_at: now,
            expires_at: now + self.policy.retention,
        };

        let mut objects = self
            .objects
            .write()
            .map_err(|e| ToolError::Storage(format!("Failed to acquire lock: {}", e)))?;
        objects.insert(
            key.clone(),
            StoredObject {
                record,
                bytes: bytes.to_vec(),
            },
        );

        debug!("Stored artifact {} ({} bytes)", key, bytes.len());
        Ok(self.signer.sign(&key, now + self.policy.link_ttl))
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(
        &self,
        category: &str,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<String> {
        self.put_at(category, bytes, filename, content_type, Utc::now())
    }

    async fn fetch_at(&self, url: &str, now: DateTime<Utc>) -> Result<Vec<u8>> {
        let key = self.signer.verify(url, now)?;
        check_key(&key)?;

        let objects = self
            .objects
            .read()
            .map_err(|e| ToolError::Storage(format!("Failed to acquire lock: {}", e)))?;
        let object = objects
            .get(&key)
            .ok_or_else(|| ToolError::Storage(format!("artifact '{}' not found", key)))?;

        if object.record.is_expired(now) {
            return Err(ToolError::Storage(format!("artifact '{}' has expired", key)));
        }

        Ok(object.bytes.clone())
    }

    async fn record(&self, key: &str) -> Result<Option<ArtifactRecord>> {
        let objects = self
            .objects
            .read()
            .map_err(|e| ToolError::Storage(format!("Failed to acquire lock: {}", e)))?;
        Ok(objects.get(key).map(|o| o.record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> MemoryArtifactStore {
        MemoryArtifactStore::new(LinkSigner::new("https://cdn.test/a", "k").unwrap())
    }

    #[tokio::test]
    async fn test_roundtrip_within_window() {
        let store = store();
        let now = Utc::now();
        let url = store
            .put_at("generated_images", b"\x89PNG", "cat.png", "image/png", now)
            .unwrap();

        let bytes = store.fetch_at(&url, now + Duration::hours(23)).await.unwrap();
        assert_eq!(bytes, b"\x89PNG");
        assert!(store.fetch_at(&url, now + Duration::hours(25)).await.is_err());
    }

    #[tokio::test]
    async fn test_object_expiry_outlives_link_only_when_configured() {
        let store = store().with_policy(RetentionPolicy {
            link_ttl: Duration::days(60),
            retention: Duration::days(30),
        });
        let now = Utc::now();
        let url = store.put_at("c", b"x", "a.txt", "text/plain", now).unwrap();

        assert!(store.fetch_at(&url, now + Duration::days(29)).await.is_ok());
        let err = store.fetch_at(&url, now + Duration::days(31)).await.unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = store();
        store.set_available(false);
        let err = store.put("c", b"x", "a.txt", "text/plain").await.unwrap_err();
        assert_eq!(err.kind(), "storage_error");
        assert_eq!(store.put_count(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_record_lookup() {
        let store = store();
        let now = Utc::now();
        store.put_at("docs", b"hello", "Plan.md", "text/markdown", now).unwrap();

        let objects = store.objects.read().unwrap();
        let key = objects.keys().next().unwrap().clone();
        drop(objects);

        let record = store.record(&key).await.unwrap().unwrap();
        assert_eq!(record.bytes_size, 5);
        assert_eq!(record.expires_at - record.created_at, Duration::days(30));
        assert!(store.record("docs/missing").await.unwrap().is_none());
    }
}
