//! FFmpeg CLI wrapper for highlight reel production.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with per-input options
//! - FFprobe stream/duration inspection
//! - Interval trimming with profile-driven re-encoding
//! - Audio bed rendering (mix plans, background looping)
//! - Single-pass concat/encode of the final reel
//! - The [`MediaEngine`] trait and its FFmpeg implementation

pub mod assemble;
pub mod audio;
pub mod command;
pub mod engine;
pub mod error;
pub mod probe;
pub mod transcode;

pub use assemble::{AssemblyClip, AssemblyRequest};
pub use audio::{
    loop_count, plan_mix, total_duration, AudioRenderRequest, BackgroundTrack, ClipAudio,
    MixPlan, MixedAudio,
};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use engine::{FfmpegEngine, MediaEngine};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_media, MediaInfo};
pub use transcode::TrimmedMedia;
