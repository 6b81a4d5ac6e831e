//! Artifact persistence with time-limited retrieval links.
//!
//! Objects are written once under a unique key and kept for the retention
//! window. Callers only ever receive a signed link, which expires on its own
//! schedule (24 hours by default) independent of the object (30 days).

mod local;
mod memory;
mod signing;

pub use local::LocalArtifactStore;
pub use memory::MemoryArtifactStore;
pub use signing::LinkSigner;

use crate::config::StorageSettings;
use crate::error::{Result, ToolError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Name used when sanitization leaves nothing.
pub const DEFAULT_FILENAME: &str = "document";

/// Metadata of one stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub key: String,
    pub content_type: String,
    pub bytes_size: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ArtifactRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Link lifetime and object retention.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub link_ttl: Duration,
    pub retention: Duration,
}

impl RetentionPolicy {
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            link_ttl: Duration::hours(settings.link_ttl_hours),
            retention: Duration::days(settings.retention_days),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            link_ttl: Duration::hours(24),
            retention: Duration::days(30),
        }
    }
}

/// A blob store that issues signed retrieval links.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `bytes` under `category` and return a signed retrieval URL.
    async fn put(
        &self,
        category: &str,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<String>;

    /// Resolve a signed URL as of `now`.
    async fn fetch_at(&self, url: &str, now: DateTime<Utc>) -> Result<Vec<u8>>;

    /// Resolve a signed URL.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch_at(url, Utc::now()).await
    }

    /// Look up the record for a storage key.
    async fn record(&self, key: &str) -> Result<Option<ArtifactRecord>>;
}

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\s\-\(\)\[\]]").expect("Invalid regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex"))
}

/// Restrict a label to letters, digits, single spaces, hyphens, parentheses
/// and brackets.
///
/// Idempotent. An empty result becomes [`DEFAULT_FILENAME`].
pub fn sanitize_filename(name: &str) -> String {
    let kept = disallowed_chars().replace_all(name, "");
    let collapsed = whitespace_runs().replace_all(&kept, " ");
    let trimmed = collapsed.trim();

    if trimmed.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitize the stem of `filename` and keep an alphanumeric extension.
pub fn artifact_filename(filename: &str) -> String {
    let (stem, extension) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (filename, None),
    };

    let stem = sanitize_filename(stem);
    match extension {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

/// Build a storage key: `{category}/{timestamp}_{random}_{filename}`.
pub fn object_key(category: &str, filename: &str, now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}_{}_{}",
        category.trim_matches('/'),
        now.format("%Y%m%d_%H%M%S"),
        &suffix[..8],
        artifact_filename(filename)
    )
}

/// Reject keys that could escape the store root.
pub(crate) fn check_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(ToolError::Storage(format!("invalid artifact key '{}'", key)));
    }
    Ok(())
}

/// Content type for a file extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "mp4" => "video/mp4",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "json" => "application/json",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
