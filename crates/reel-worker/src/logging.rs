//! Structured job logging utilities.
//!
//! Every line carries the job ID and the stage it was emitted from, so a
//! single reel can be followed through extraction, mixing and assembly.

use tracing::{error, info, warn, Span};

use reel_models::{JobId, JobState};

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    stage: String,
}

impl JobLogger {
    /// Create a logger for `job_id` positioned at `stage`.
    pub fn new(job_id: &JobId, stage: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Same job, different stage.
    pub fn for_stage(&self, stage: &str) -> Self {
        Self {
            job_id: self.job_id.clone(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "Job started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "{}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, stage = %self.stage, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, stage = %self.stage, "Job error: {}", message);
    }

    /// Log a per-clip event.
    pub fn log_clip(&self, clip_index: usize, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %self.stage,
            clip_index,
            "{}", message
        );
    }

    /// Log a per-clip warning.
    pub fn log_clip_warning(&self, clip_index: usize, message: &str) {
        warn!(
            job_id = %self.job_id,
            stage = %self.stage,
            clip_index,
            "{}", message
        );
    }

    /// Log a state machine transition.
    pub fn log_transition(&self, from: JobState, to: JobState) {
        info!(
            job_id = %self.job_id,
            from = %from,
            to = %to,
            "Job state changed"
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "Job completed: {}", message);
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id)
    }
}
