//! Engaging interval selection.
//!
//! The recommender is asked for the single most engaging span of a clip.
//! Whatever goes wrong (transport, timeout, malformed answer, bad span) the
//! selector substitutes [`EngagingInterval::FALLBACK`]; selection never
//! fails a job.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use reel_models::interval::{MAX_SPAN_SECS, MIN_SPAN_SECS};
use reel_models::EngagingInterval;

use crate::metrics;

/// Instruction sent alongside every video.
pub fn selection_prompt() -> String {
    format!(
        "Watch this video and choose the single most engaging contiguous span. \
         The span must be between {min:.0} and {max:.0} seconds long and must cover a \
         complete event, so it should not start or stop in the middle of the action. \
         Answer with exactly two numbers in seconds, start and end, separated by a comma \
         (for example: 12.5,20.0). Do not add any other text.",
        min = MIN_SPAN_SECS,
        max = MAX_SPAN_SECS
    )
}

/// A video as presented to the recommender.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoReference {
    /// Remote or signed URL of the source
    pub url: String,
    /// Local copy, when the fetch succeeded
    pub local_path: Option<PathBuf>,
}

impl VideoReference {
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            local_path: None,
        }
    }

    pub fn with_local_copy(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }
}

/// Recommendation service failures.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("recommendation service not configured: {0}")]
    NotConfigured(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response contained no text")]
    EmptyResponse,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// External service that proposes an interval as `"start,end"` text.
#[async_trait]
pub trait IntervalRecommender: Send + Sync {
    async fn recommend(&self, video: &VideoReference) -> Result<String, RecommendError>;
}

/// Outcome of one selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub interval: EngagingInterval,
    pub used_fallback: bool,
}

impl Selection {
    fn fallback() -> Self {
        Self {
            interval: EngagingInterval::FALLBACK,
            used_fallback: true,
        }
    }
}

/// Chooses the engaging interval for each clip.
#[derive(Clone)]
pub struct IntervalSelector {
    recommender: Arc<dyn IntervalRecommender>,
    timeout: Duration,
}

impl IntervalSelector {
    pub fn new(recommender: Arc<dyn IntervalRecommender>, timeout: Duration) -> Self {
        Self {
            recommender,
            timeout,
        }
    }

    /// Ask the recommender and validate its answer.
    ///
    /// `source_duration`, when known, clamps the end of the interval before
    /// the span check.
    pub async fn select(&self, video: &VideoReference, source_duration: Option<f64>) -> Selection {
        let answer = match tokio::time::timeout(self.timeout, self.recommender.recommend(video)).await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(url = %video.url, error = %e, "Interval recommendation failed, using default");
                metrics::record_interval_fallback("request");
                return Selection::fallback();
            }
            Err(_) => {
                warn!(
                    url = %video.url,
                    timeout_secs = self.timeout.as_secs(),
                    "Interval recommendation timed out, using default"
                );
                metrics::record_interval_fallback("timeout");
                return Selection::fallback();
            }
        };

        match EngagingInterval::from_recommendation(&answer, source_duration) {
            Ok(interval) => {
                debug!(url = %video.url, start = interval.start, end = interval.end, "Interval selected");
                Selection {
                    interval,
                    used_fallback: false,
                }
            }
            Err(e) => {
                warn!(
                    url = %video.url,
                    answer = %answer.trim(),
                    error = %e,
                    "Rejected interval recommendation, using default"
                );
                metrics::record_interval_fallback("invalid");
                Selection::fallback()
            }
        }
    }
}
