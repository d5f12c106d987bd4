//! Object store abstraction and storage key layout.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{StorageError, StorageResult};

/// Prefix for finished reels.
pub const OUTPUT_PREFIX: &str = "completeHighlights";
/// Prefix for per-job staged source copies.
pub const STAGING_PREFIX: &str = "staging";
/// Content type for uploaded reels and staged sources.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";
/// Maximum allowed signed URL lifetime (7 days).
pub const MAX_SIGNED_URL_TTL_SECS: u64 = 604_800;

/// Durable key/value blob storage used by the pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's bytes.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Store bytes under `key`.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Whether `key` exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Time-limited read URL for `key`.
    async fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String>;

    /// Remove `key`.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Reject keys that cannot be valid object names.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|s| s == "..") {
        return Err(StorageError::invalid_key(key));
    }
    Ok(())
}

/// Signed URL lifetimes are capped at seven days.
pub fn clamp_ttl(ttl: Duration) -> Duration {
    ttl.min(Duration::from_secs(MAX_SIGNED_URL_TTL_SECS))
}

/// Key for a finished reel: `completeHighlights/<owner>/<millis>-<job>.mp4`.
///
/// The owner becomes a single path segment; the job id keeps two jobs of
/// one owner apart when they finish in the same millisecond.
pub fn output_key(owner_id: &str, at: DateTime<Utc>, job_id: &str) -> String {
    format!(
        "{}/{}/{}-{}.mp4",
        OUTPUT_PREFIX,
        urlencoding::encode(owner_id),
        at.timestamp_millis(),
        urlencoding::encode(job_id)
    )
}

/// Key for a staged source copy: `staging/<job>/<index>.mp4`.
pub fn staging_key(job_id: &str, index: usize) -> String {
    format!("{}/{}/{}.mp4", STAGING_PREFIX, job_id, index)
}

/// Public URL for `key` under `base_url`, percent-encoding each segment.
pub fn public_url(base_url: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", base_url.trim_end_matches('/'), encoded.join("/"))
}
