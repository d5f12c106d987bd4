//! Compilation job definitions and the job state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{AudioTrackRef, QualityProfile, VolumeSpec};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline state of a compilation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Job accepted, nothing started
    #[default]
    Created,
    /// Clip workers are running
    ExtractingClips,
    /// Compositing clip audio with background music
    MixingAudio,
    /// Concatenating, encoding and uploading
    Assembling,
    /// Reel uploaded
    Uploaded,
    /// Job failed
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::ExtractingClips => "extracting_clips",
            JobState::MixingAudio => "mixing_audio",
            JobState::Assembling => "assembling",
            JobState::Uploaded => "uploaded",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Uploaded | JobState::Failed)
    }

    /// Allowed edges of the state machine.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Created, ExtractingClips)
                | (Created, Failed)
                | (ExtractingClips, MixingAudio)
                | (ExtractingClips, Failed)
                | (MixingAudio, Assembling)
                | (Assembling, Uploaded)
                | (Assembling, Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One source clip to extract, tagged with its position in the reel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClipRequest {
    pub source_url: String,
    pub index: usize,
}

/// A single request to produce one highlight reel.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompilationJob {
    /// Unique job ID
    pub id: JobId,

    /// Owner of the output (used in the storage key)
    pub owner_id: String,

    /// Source videos in reel order
    pub source_urls: Vec<String>,

    /// Optional background music
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_track: Option<AudioTrackRef>,

    /// Quality tier for every encode in the job
    #[serde(default)]
    pub quality: QualityProfile,

    /// Clip audio and music gains
    #[serde(default)]
    pub volumes: VolumeSpec,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl CompilationJob {
    /// Create a new job with default quality and volumes.
    pub fn new(owner_id: impl Into<String>, source_urls: Vec<String>) -> Self {
        Self {
            id: JobId::new(),
            owner_id: owner_id.into(),
            source_urls,
            audio_track: None,
            quality: QualityProfile::default(),
            volumes: VolumeSpec::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_audio_track(mut self, track: impl Into<String>) -> Self {
        self.audio_track = Some(AudioTrackRef::new(track));
        self
    }

    pub fn with_quality(mut self, quality: QualityProfile) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_volumes(mut self, volumes: VolumeSpec) -> Self {
        self.volumes = volumes;
        self
    }

    /// Validate the job before any work starts.
    pub fn validate(&self) -> Result<(), String> {
        if self.source_urls.is_empty() {
            return Err("No videos provided for compilation".to_string());
        }
        if let Some(pos) = self.source_urls.iter().position(|u| u.trim().is_empty()) {
            return Err(format!("Source URL at index {} is empty", pos));
        }
        if self.owner_id.trim().is_empty() {
            return Err("Owner ID is required".to_string());
        }
        self.volumes.validate()
    }

    /// Index-tagged clip requests in reel order.
    pub fn clip_requests(&self) -> Vec<ClipRequest> {
        self.source_urls
            .iter()
            .enumerate()
            .map(|(index, url)| ClipRequest {
                source_url: url.clone(),
                index,
            })
            .collect()
    }
}
