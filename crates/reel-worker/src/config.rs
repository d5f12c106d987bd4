//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work directory for per-job temporary files
    pub work_dir: String,
    /// Maximum clips extracted in parallel within a single job
    pub max_clip_parallel: usize,
    /// Timeout for one interval recommendation call
    pub recommend_timeout: Duration,
    /// Timeout for one FFmpeg invocation
    pub ffmpeg_timeout: Duration,
    /// Timeout for one source or music download
    pub download_timeout: Duration,
    /// Wall-clock budget for a whole job
    pub job_timeout: Duration,
    /// Upload fetched sources to storage so the recommender reads signed URLs
    pub stage_sources: bool,
    /// Base URL under which uploaded reels are publicly served
    pub public_base_url: Option<String>,
    /// Lifetime of signed URLs handed out when no public base URL is set
    pub signed_url_ttl: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/reel".to_string(),
            max_clip_parallel: 4,
            recommend_timeout: Duration::from_secs(90),
            ffmpeg_timeout: Duration::from_secs(600),
            download_timeout: Duration::from_secs(300),
            job_timeout: Duration::from_secs(3600), // 1 hour
            stage_sources: false,
            public_base_url: None,
            signed_url_ttl: Duration::from_secs(604_800), // 7 days
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            work_dir: lookup("WORKER_WORK_DIR")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.work_dir),
            max_clip_parallel: lookup("WORKER_MAX_CLIP_PARALLEL")
                .and_then(|s| s.trim().parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_clip_parallel),
            recommend_timeout: secs("WORKER_RECOMMEND_TIMEOUT", defaults.recommend_timeout),
            ffmpeg_timeout: secs("WORKER_FFMPEG_TIMEOUT", defaults.ffmpeg_timeout),
            download_timeout: secs("WORKER_DOWNLOAD_TIMEOUT", defaults.download_timeout),
            job_timeout: secs("WORKER_JOB_TIMEOUT", defaults.job_timeout),
            stage_sources: lookup("WORKER_STAGE_SOURCES")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.stage_sources),
            public_base_url: lookup("OUTPUT_PUBLIC_BASE_URL")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),
            signed_url_ttl: secs("OUTPUT_SIGNED_URL_TTL", defaults.signed_url_ttl),
        }
    }
}
