//! Audio mixing stage.
//!
//! Builds the reel's audio bed from the clip audio and the optional
//! background track. Background problems degrade to original-only audio and
//! a failed render degrades to silence; this stage never fails a job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reel_media::{
    plan_mix, total_duration, AudioRenderRequest, BackgroundTrack, ClipAudio, MediaEngine,
    MixPlan, MixedAudio,
};
use reel_models::{AudioTrackRef, EncodingProfile, VolumeSpec};

use crate::extract::ProcessedClip;
use crate::logging::JobLogger;
use crate::metrics;
use crate::source::SourceFetcher;

/// Produces the audio bed for an assembled reel.
#[derive(Clone)]
pub struct AudioMixer {
    engine: Arc<dyn MediaEngine>,
    fetcher: SourceFetcher,
}

impl AudioMixer {
    pub fn new(engine: Arc<dyn MediaEngine>, fetcher: SourceFetcher) -> Self {
        Self { engine, fetcher }
    }

    /// Mix clip audio with `track` at `volumes` into a file under `work_dir`.
    pub async fn mix(
        &self,
        clips: &[ProcessedClip],
        track: Option<&AudioTrackRef>,
        volumes: &VolumeSpec,
        profile: &EncodingProfile,
        work_dir: &Path,
        logger: &JobLogger,
    ) -> MixedAudio {
        let clip_audio: Vec<ClipAudio> = clips
            .iter()
            .map(|c| ClipAudio {
                path: c.path().to_path_buf(),
                has_audio: c.has_audio,
                duration: c.duration,
            })
            .collect();
        let total = total_duration(&clip_audio);

        let background = match track {
            Some(track) if volumes.wants_music() => {
                match self.load_background(track, work_dir).await {
                    Ok(bg) => Some(bg),
                    Err(reason) => {
                        logger.log_warning(&format!(
                            "Background track {} unavailable, using original audio: {}",
                            track.as_str(),
                            reason.message
                        ));
                        metrics::record_background_fallback(reason.kind);
                        None
                    }
                }
            }
            _ => None,
        };

        let plan = plan_mix(&clip_audio, background.as_ref().map(|b| b.duration), volumes);
        logger.log_progress(&format!(
            "Audio plan {} over {:.2}s ({} clips)",
            plan.name(),
            total,
            clips.len()
        ));

        let request = AudioRenderRequest {
            plan,
            clips: clip_audio,
            background,
            total_duration: total,
            profile: profile.clone(),
        };
        let output = work_dir.join("mix.m4a");

        match self.engine.render_audio(&request, &output).await {
            Ok(mixed) => return mixed,
            Err(e) if plan.uses_background() => {
                logger.log_warning(&format!(
                    "Background mix failed, retrying with original audio: {}",
                    e
                ));
                metrics::record_background_fallback("render");
            }
            Err(e) => {
                logger.log_warning(&format!("Audio render failed, using silence: {}", e));
                return MixedAudio::Silence;
            }
        }

        let fallback_plan = plan_mix(&request.clips, None, volumes);
        if fallback_plan == MixPlan::Silence {
            return MixedAudio::Silence;
        }
        let fallback = AudioRenderRequest {
            plan: fallback_plan,
            background: None,
            ..request
        };
        match self.engine.render_audio(&fallback, &output).await {
            Ok(mixed) => mixed,
            Err(e) => {
                logger.log_warning(&format!("Audio render failed, using silence: {}", e));
                MixedAudio::Silence
            }
        }
    }

    async fn load_background(
        &self,
        track: &AudioTrackRef,
        work_dir: &Path,
    ) -> Result<BackgroundTrack, BackgroundFailure> {
        let key = track
            .storage_key()
            .ok_or_else(|| BackgroundFailure::new("catalog", "unknown audio track"))?;

        let path = work_dir.join(background_file_name(&key));
        self.fetcher
            .fetch(&key, &path)
            .await
            .map_err(|e| BackgroundFailure::new("fetch", e.to_string()))?;

        let info = self
            .engine
            .probe(&path)
            .await
            .map_err(|e| BackgroundFailure::new("probe", e.to_string()))?;

        match info.duration {
            Some(duration) if info.has_audio && duration > 0.0 => Ok(BackgroundTrack { path, duration }),
            _ => Err(BackgroundFailure::new("probe", "track has no playable audio")),
        }
    }
}

struct BackgroundFailure {
    kind: &'static str,
    message: String,
}

impl BackgroundFailure {
    fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Local file name for a background key, keeping its extension.
fn background_file_name(key: &str) -> PathBuf {
    let ext = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("audio");
    PathBuf::from(format!("background.{}", ext))
}
