//! Filesystem artifact store with a SQLite record index.
//!
//! Bytes live under `root_dir/{key}`; records live in SQLite so expiry can be
//! enforced at retrieval time without a sweep.

use super::{check_key, object_key, ArtifactRecord, ArtifactStore, LinkSigner, RetentionPolicy};
use crate::config::Settings;
use crate::error::{Result, ToolError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS artifacts (
    key TEXT PRIMARY KEY,
    content_type TEXT NOT NULL,
    bytes_size INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_artifacts_expires_at ON artifacts(expires_at);
"#;

/// Artifact store backed by a local directory.
pub struct LocalArtifactStore {
    root: PathBuf,
    conn: Mutex<Connection>,
    signer: LinkSigner,
    policy: RetentionPolicy,
}

impl LocalArtifactStore {
    /// Open (or create) a store rooted at `root` with its index at `index_path`.
    #[instrument(skip(signer, policy))]
    pub fn new(
        root: &Path,
        index_path: &Path,
        signer: LinkSigner,
        policy: RetentionPolicy,
    ) -> Result<Self> {
        if let Some(parent) = index_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(index_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized artifact store at {:?}", root);

        Ok(Self {
            root: root.to_path_buf(),
            conn: Mutex::new(conn),
            signer,
            policy,
        })
    }

    /// Build the store described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let secret = settings.signing_key().ok_or_else(|| {
            ToolError::Configuration(
                "no artifact signing key; set ATELIER_SIGNING_KEY or storage.signing_key"
                    .to_string(),
            )
        })?;
        let signer = LinkSigner::new(&settings.storage.public_base_url, &secret)?;

        Self::new(
            &settings.artifact_dir(),
            &settings.artifact_index_path(),
            signer,
            RetentionPolicy::from_settings(&settings.storage),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// One diagnostic check that the root is a usable directory.
    async fn check_root(&self) -> Result<()> {
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            error!("Artifact root {:?} cannot be created: {}", self.root, e);
            return Err(ToolError::Storage(format!(
                "artifact root {} is not accessible: {}",
                self.root.display(),
                e
            )));
        }

        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => Ok(()),
            Ok(_) => Err(ToolError::Storage(format!(
                "artifact root {} is not a writable directory",
                self.root.display()
            ))),
            Err(e) => Err(ToolError::Storage(format!(
                "artifact root {} is not accessible: {}",
                self.root.display(),
                e
            ))),
        }
    }

    fn insert_record(&self, record: &ArtifactRecord) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ToolError::Storage(format!("Failed to acquire lock: {}", e)))?;

        conn.execute(
            r#"
            INSERT INTO artifacts (key, content_type, bytes_size, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.key,
                record.content_type,
                record.bytes_size as i64,
                record.created_at.to_rfc3339(),
                record.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load_record(&self, key: &str) -> Result<Option<ArtifactRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ToolError::Storage(format!("Failed to acquire lock: {}", e)))?;

        let row = conn
            .query_row(
                "SELECT key, content_type, bytes_size, created_at, expires_at FROM artifacts WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(key, content_type, size, created, expires)| {
            Ok(ArtifactRecord {
                key,
                content_type,
                bytes_size: size.max(0) as u64,
                created_at: parse_timestamp(&created)?,
                expires_at: parse_timestamp(&expires)?,
            })
        })
        .transpose()
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ToolError::Storage(format!("corrupt timestamp '{}': {}", value, e)))
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(
        &self,
        category: &str,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<String> {
        let now = Utc::now();
        let key = object_key(category, filename, now);
        check_key(&key)?;

        self.check_root().await?;

        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ToolError::Storage(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            error!("Failed to write artifact {}: {}", key, e);
            ToolError::Storage(format!("failed to write artifact '{}': {}", key, e))
        })?;

        let record = ArtifactRecord {
            key: key.clone(),
            content_type: content_type.to_string(),
            bytes_size: bytes.len() as u64,
            created_at: now,
            expires_at: now + self.policy.retention,
        };
        if let Err(e) = self.insert_record(&record) {
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove unindexed artifact {}: {}", key, cleanup);
            }
            return Err(match e {
                ToolError::Storage(_) => e,
                other => {
                    ToolError::Storage(format!("failed to index artifact '{}': {}", key, other))
                }
            });
        }

        info!("Artifact uploaded: {}", key);
        Ok(self.signer.sign(&key, now + self.policy.link_ttl))
    }

    #[instrument(skip(self, url))]
    async fn fetch_at(&self, url: &str, now: DateTime<Utc>) -> Result<Vec<u8>> {
        let key = self.signer.verify(url, now)?;
        check_key(&key)?;

        let record = self
            .load_record(&key)?
            .ok_or_else(|| ToolError::Storage(format!("artifact '{}' not found", key)))?;
        if record.is_expired(now) {
            return Err(ToolError::Storage(format!("artifact '{}' has expired", key)));
        }

        debug!("Reading artifact {}", key);
        tokio::fs::read(self.root.join(&key))
            .await
            .map_err(|e| ToolError::Storage(format!("failed to read artifact '{}': {}", key, e)))
    }

    async fn record(&self, key: &str) -> Result<Option<ArtifactRecord>> {
        self.load_record(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn open(dir: &Path) -> LocalArtifactStore {
        LocalArtifactStore::new(
            &dir.join("objects"),
            &dir.join("index.db"),
            LinkSigner::new("http://localhost:8080/artifacts", "secret").unwrap(),
            RetentionPolicy::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        let url = store
            .put("generated_documents", &payload, "Budget: 2024 (v2).csv", "text/csv")
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:8080/artifacts/generated_documents/"));

        let fetched = store.fetch(&url).await.unwrap();
        assert_eq!(fetched, payload);

        let expired = store.fetch_at(&url, Utc::now() + Duration::hours(25)).await;
        assert_eq!(expired.unwrap_err().kind(), "storage_error");
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = open(dir.path())
            .put("generated_images", b"img", "cat.png", "image/png")
            .await
            .unwrap();

        let reopened = open(dir.path());
        assert_eq!(reopened.fetch(&url).await.unwrap(), b"img");

        let key = reopened
            .signer
            .verify(&url, Utc::now())
            .unwrap();
        let record = reopened.record(&key).await.unwrap().unwrap();
        assert_eq!(record.content_type, "image/png");
        assert_eq!(record.bytes_size, 3);
        assert_eq!(record.expires_at - record.created_at, Duration::days(30));
    }

    #[tokio::test]
    async fn test_root_that_is_a_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("objects");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = open(dir.path());
        let err = store.put("c", b"x", "a.txt", "text/plain").await.unwrap_err();
        assert_eq!(err.kind(), "storage_error");
        assert!(err.to_string().contains("objects"));
    }

    fn files_under(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| {
                        let path = e.path();
                        if path.is_dir() {
                            files_under(&path)
                        } else {
                            1
                        }
                    })
                    .sum()
            })
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_failed_index_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store
            .conn
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE artifacts;")
            .unwrap();

        let err = store
            .put("generated_documents", b"rows", "t.csv", "text/csv")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "storage_error");
        assert_eq!(files_under(store.root()), 0);
    }

    #[test]
    fn test_from_settings_with_signing_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.storage.root_dir = dir.path().join("a").to_string_lossy().into_owned();
        settings.storage.index_path = dir.path().join("a.db").to_string_lossy().into_owned();
        settings.storage.signing_key = Some("k".to_string());
        assert!(LocalArtifactStore::from_settings(&settings).is_ok());
    }
}
