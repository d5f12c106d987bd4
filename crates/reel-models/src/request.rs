//! Caller-facing compilation request.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::volume::{DEFAULT_MUSIC_VOLUME, DEFAULT_ORIGINAL_VOLUME};
use crate::{AudioTrackRef, CompilationJob, QualityProfile, VolumeSpec};

/// Payload accepted from the orchestrating caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompilationRequest {
    /// Source videos in reel order
    #[serde(default)]
    pub source_urls: Vec<String>,

    /// Built-in track id, `custom_<file>`, or storage key
    #[serde(default)]
    pub audio_track: Option<String>,

    /// Quality tier (defaults to `standard`)
    #[serde(default)]
    pub quality: Option<QualityProfile>,

    /// Gain for clip audio (defaults to 1.0)
    #[serde(default)]
    pub original_volume: Option<f32>,

    /// Gain for background music (defaults to 0.5)
    #[serde(default)]
    pub music_volume: Option<f32>,
}

impl CompilationRequest {
    /// Effective volumes after applying defaults.
    pub fn volumes(&self) -> VolumeSpec {
        VolumeSpec::new(
            self.original_volume.unwrap_or(DEFAULT_ORIGINAL_VOLUME),
            self.music_volume.unwrap_or(DEFAULT_MUSIC_VOLUME),
        )
    }

    /// Validate the request.
    ///
    /// An empty source list is left to the orchestrator, which reports it
    /// as a validation failure of the job itself.
    pub fn validate(&self) -> Result<(), String> {
        self.volumes().validate()
    }

    /// Build the job for `owner_id`.
    pub fn into_job(self, owner_id: impl Into<String>) -> CompilationJob {
        let volumes = self.volumes();
        let mut job = CompilationJob::new(owner_id, self.source_urls)
            .with_quality(self.quality.unwrap_or_default())
            .with_volumes(volumes);
        job.audio_track = self
            .audio_track
            .filter(|t| !t.trim().is_empty())
            .map(AudioTrackRef::new);
        job
    }
}
