//! Reel assembly and upload.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use reel_media::{AssemblyClip, AssemblyRequest, MediaEngine, MixedAudio};
use reel_models::{EncodingProfile, OutputArtifact};
use reel_storage::{output_key, public_url, ObjectStore, VIDEO_CONTENT_TYPE};

use crate::error::CompilationError;
use crate::extract::ProcessedClip;
use crate::logging::JobLogger;
use crate::staging::StagingLedger;

/// How uploaded reels are referenced.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// Serve from `<base>/<key>` when set
    pub public_base_url: Option<String>,
    /// Signed URL lifetime otherwise
    pub signed_url_ttl: Duration,
}

/// Encodes the final reel and uploads it.
#[derive(Clone)]
pub struct ReelAssembler {
    engine: Arc<dyn MediaEngine>,
    store: Arc<dyn ObjectStore>,
    publish: PublishSettings,
}

impl ReelAssembler {
    pub fn new(engine: Arc<dyn MediaEngine>, store: Arc<dyn ObjectStore>, publish: PublishSettings) -> Self {
        Self {
            engine,
            store,
            publish,
        }
    }

    /// Encode `clips` (already in reel order) with `audio` and upload the result.
    pub async fn encode(
        &self,
        clips: &[ProcessedClip],
        audio: MixedAudio,
        profile: &EncodingProfile,
        work_dir: &Path,
        logger: &JobLogger,
    ) -> Result<EncodedReel, CompilationError> {
        let output = tempfile::Builder::new()
            .prefix("reel_")
            .suffix(".mp4")
            .tempfile_in(work_dir)
            .map_err(|e| CompilationError::assembling(format!("failed to create output file: {}", e)))?
            .into_temp_path();

        let request = AssemblyRequest {
            clips: clips
                .iter()
                .map(|c| AssemblyClip {
                    path: c.path().to_path_buf(),
                    duration: c.duration,
                })
                .collect(),
            audio,
            profile: profile.clone(),
        };

        let duration = self
            .engine
            .assemble(&request, &output)
            .await
            .map_err(|e| CompilationError::assembling(format!("encode failed: {}", e)))?;

        logger.log_progress(&format!(
            "Encoded reel: {} clips, {:.2}s",
            clips.len(),
            duration
        ));

        Ok(EncodedReel {
            file: output,
            duration,
            clip_count: clips.len(),
        })
    }

    /// Upload an encoded reel for `job_id` of `owner_id` and resolve its
    /// public reference.
    ///
    /// The output key sits in `ledger` until the reference is resolved, so
    /// an interrupted upload is swept with the job's other temporary objects.
    pub async fn upload(
        &self,
        reel: EncodedReel,
        owner_id: &str,
        job_id: &str,
        ledger: &StagingLedger,
        logger: &JobLogger,
    ) -> Result<OutputArtifact, CompilationError> {
        let bytes = tokio::fs::read(&reel.file)
            .await
            .map_err(|e| CompilationError::uploading(format!("failed to read encoded reel: {}", e)))?;
        let key = output_key(owner_id, Utc::now(), job_id);
        ledger.record(key.clone()).await;

        if let Err(e) = self.store.put(&key, bytes, VIDEO_CONTENT_TYPE).await {
            self.discard(&key, logger).await;
            return Err(CompilationError::uploading(format!("upload failed: {}", e)));
        }

        let public_reference = match &self.publish.public_base_url {
            Some(base) => public_url(base, &key),
            None => match self.store.signed_url(&key, self.publish.signed_url_ttl).await {
                Ok(url) => url,
                Err(e) => {
                    self.discard(&key, logger).await;
                    return Err(CompilationError::uploading(format!(
                        "failed to sign output URL: {}",
                        e
                    )));
                }
            },
        };

        ledger.forget(&key).await;
        logger.log_progress(&format!("Uploaded reel to {}", key));
        Ok(OutputArtifact {
            storage_key: key,
            public_reference,
            duration: reel.duration,
            clip_count: reel.clip_count,
        })
    }

    /// Best-effort removal of a partially published output.
    async fn discard(&self, key: &str, logger: &JobLogger) {
        if let Err(e) = self.store.delete(key).await {
            logger.log_warning(&format!("Failed to remove partial output {}: {}", key, e));
        }
    }
}

/// A locally encoded reel. Dropping it deletes the file.
#[derive(Debug)]
pub struct EncodedReel {
    pub file: tempfile::TempPath,
    pub duration: f64,
    pub clip_count: usize,
}
