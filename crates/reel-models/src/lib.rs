//! Shared data models for the highlight reel compiler.
//!
//! This crate provides Serde-serializable types for:
//! - Compilation jobs, clip requests and the job state machine
//! - Engaging intervals and their validation rules
//! - Quality profiles and encoding parameters
//! - Volume settings and background audio track references
//! - The caller-facing compilation request and the output artifact

pub mod artifact;
pub mod audio_track;
pub mod encoding;
pub mod interval;
pub mod job;
pub mod request;
pub mod volume;

// Re-export common types
pub use artifact::OutputArtifact;
pub use audio_track::AudioTrackRef;
pub use encoding::{EncodingProfile, QualityProfile};
pub use interval::{EngagingInterval, IntervalParseError};
pub use job::{ClipRequest, CompilationJob, JobId, JobState};
pub use request::CompilationRequest;
pub use volume::VolumeSpec;
