//! Clip extraction worker.
//!
//! One worker handles one source: fetch, select the engaging interval,
//! trim. A failed fetch or trim gets exactly one retry with
//! [`EngagingInterval::RETRY`]; a second failure is fatal for the job.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempPath;

use reel_media::MediaEngine;
use reel_models::{ClipRequest, EncodingProfile, EngagingInterval};
use reel_storage::{staging_key, ObjectStore, VIDEO_CONTENT_TYPE};

use crate::error::ClipError;
use crate::interval::{IntervalSelector, Selection, VideoReference};
use crate::logging::JobLogger;
use crate::metrics;
use crate::source::SourceFetcher;
use crate::staging::StagingLedger;

/// A trimmed clip ready for assembly. Dropping it deletes the media file.
#[derive(Debug)]
pub struct ProcessedClip {
    /// Position in the reel
    pub index: usize,
    /// Trimmed media file
    pub media: TempPath,
    /// Measured duration in seconds
    pub duration: f64,
    /// Whether the media carries an audio stream
    pub has_audio: bool,
    /// Interval that was cut
    pub interval: EngagingInterval,
    /// Whether the interval is a default rather than a recommendation
    pub used_fallback: bool,
}

impl ProcessedClip {
    pub fn path(&self) -> &Path {
        &self.media
    }
}

/// Per-job settings shared by every worker.
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    /// Job-scoped temporary directory
    pub work_dir: PathBuf,
    pub profile: EncodingProfile,
    /// Encode clip audio (false when the original volume is zero)
    pub keep_audio: bool,
}

/// Where fetched sources are staged for the recommender.
#[derive(Clone)]
struct StagingTarget {
    job_id: String,
    ledger: Arc<StagingLedger>,
    ttl: Duration,
}

/// Runs the fetch, select, trim sequence for individual clips.
#[derive(Clone)]
pub struct ClipExtractor {
    engine: Arc<dyn MediaEngine>,
    store: Arc<dyn ObjectStore>,
    fetcher: SourceFetcher,
    selector: IntervalSelector,
    settings: ExtractionSettings,
    staging: Option<StagingTarget>,
    logger: JobLogger,
}

impl ClipExtractor {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        store: Arc<dyn ObjectStore>,
        fetcher: SourceFetcher,
        selector: IntervalSelector,
        settings: ExtractionSettings,
        logger: JobLogger,
    ) -> Self {
        Self {
            engine,
            store,
            fetcher,
            selector,
            settings,
            staging: None,
            logger,
        }
    }

    /// Stage fetched sources under `staging/<job_id>/` and record them in `ledger`.
    pub fn with_staging(mut self, job_id: impl Into<String>, ledger: Arc<StagingLedger>, ttl: Duration) -> Self {
        self.staging = Some(StagingTarget {
            job_id: job_id.into(),
            ledger,
            ttl,
        });
        self
    }

    /// Extract one clip.
    pub async fn extract(&self, request: &ClipRequest) -> Result<ProcessedClip, ClipError> {
        let index = request.index;
        let source = self.temp_path(&format!("source_{}_", index), index)?;

        let fetched = match self.fetcher.fetch(&request.source_url, &source).await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.logger
                    .log_clip_warning(index, &format!("Fetch failed: {}", e));
                Err(format!("fetch failed: {}", e))
            }
        };

        let fetch_ok = fetched.is_ok();
        let mut video = VideoReference::remote(&request.source_url);
        let mut source_duration = None;
        if fetch_ok {
            video = video.with_local_copy(source.to_path_buf());
            if let Some(url) = self.stage_source(index, &source).await {
                video.url = url;
            }
            source_duration = self
                .engine
                .probe(&source)
                .await
                .ok()
                .and_then(|info| info.duration);
        }

        let selection = self.selector.select(&video, source_duration).await;
        if selection.used_fallback {
            self.logger
                .log_clip_warning(index, "Using default interval");
        }

        let first_error = match fetched {
            Ok(()) => match self.trim(index, &source, selection).await {
                Ok(clip) => return Ok(clip),
                Err(e) => e,
            },
            Err(e) => e,
        };

        metrics::record_transcode_retry();
        self.logger.log_clip_warning(
            index,
            &format!("Retrying with fixed interval after: {}", first_error),
        );

        if !fetch_ok {
            self.fetcher
                .fetch(&request.source_url, &source)
                .await
                .map_err(|e| ClipError::new(index, format!("source unreachable: {}", e)))?;
        }

        let retry = Selection {
            interval: EngagingInterval::RETRY,
            used_fallback: true,
        };
        self.trim(index, &source, retry)
            .await
            .map_err(|e| ClipError::new(index, e))
    }

    async fn trim(&self, index: usize, source: &Path, selection: Selection) -> Result<ProcessedClip, String> {
        let output = self
            .temp_path(&format!("clip_{}_", index), index)
            .map_err(|e| e.message)?;

        let trimmed = self
            .engine
            .trim(
                source,
                &output,
                &selection.interval,
                &self.settings.profile,
                self.settings.keep_audio,
            )
            .await
            .map_err(|e| match e.stderr_summary() {
                Some(line) => format!("transcode failed: {} ({})", e, line),
                None => format!("transcode failed: {}", e),
            })?;

        metrics::record_clip_extracted();
        self.logger.log_clip(
            index,
            &format!(
                "Clip extracted [{:.2}s, {:.2}s) duration={:.2}s audio={}",
                selection.interval.start, selection.interval.end, trimmed.duration, trimmed.has_audio
            ),
        );

        Ok(ProcessedClip {
            index,
            media: output,
            duration: trimmed.duration,
            has_audio: trimmed.has_audio,
            interval: selection.interval,
            used_fallback: selection.used_fallback,
        })
    }

    /// Upload the fetched copy and return a signed URL for it.
    ///
    /// Staging is best effort; on failure the original URL is used.
    async fn stage_source(&self, index: usize, source: &Path) -> Option<String> {
        let staging = self.staging.as_ref()?;
        let key = staging_key(&staging.job_id, index);

        let result = async {
            let bytes = tokio::fs::read(source).await?;
            staging.ledger.record(key.clone()).await;
            self.store.put(&key, bytes, VIDEO_CONTENT_TYPE).await?;
            let url = self.store.signed_url(&key, staging.ttl).await?;
            Ok::<_, crate::error::WorkerError>(url)
        }
        .await;

        match result {
            Ok(url) => Some(url),
            Err(e) => {
                self.logger
                    .log_clip_warning(index, &format!("Staging failed, using source URL: {}", e));
                None
            }
        }
    }

    fn temp_path(&self, prefix: &str, index: usize) -> Result<TempPath, ClipError> {
        tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".mp4")
            .tempfile_in(&self.settings.work_dir)
            .map(|f| f.into_temp_path())
            .map_err(|e| ClipError::new(index, format!("failed to create temp file: {}", e)))
    }
}
