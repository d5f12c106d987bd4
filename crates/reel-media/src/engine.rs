//! Media engine abstraction.
//!
//! The pipeline talks to [`MediaEngine`] so it can run against FFmpeg in
//! production and against in-process fakes in tests.

use async_trait::async_trait;
use std::path::Path;

use reel_models::{EncodingProfile, EngagingInterval};

use crate::assemble::{assemble_reel, AssemblyRequest};
use crate::audio::{render_mix, AudioRenderRequest, MixedAudio};
use crate::command::{check_ffmpeg, check_ffprobe, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::{probe_media, MediaInfo};
use crate::transcode::{trim_to_interval, TrimmedMedia};

/// Transcoding operations used by the compilation pipeline.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Inspect a local media file.
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;

    /// Cut `interval` out of `input` and re-encode it into `output`.
    async fn trim(
        &self,
        input: &Path,
        output: &Path,
        interval: &EngagingInterval,
        profile: &EncodingProfile,
        keep_audio: bool,
    ) -> MediaResult<TrimmedMedia>;

    /// Render the reel's audio bed.
    async fn render_audio(&self, request: &AudioRenderRequest, output: &Path) -> MediaResult<MixedAudio>;

    /// Encode the final reel; returns its duration.
    async fn assemble(&self, request: &AssemblyRequest, output: &Path) -> MediaResult<f64>;
}

/// [`MediaEngine`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    runner: FfmpegRunner,
}

impl FfmpegEngine {
    /// Create an engine whose FFmpeg invocations are killed after `timeout_secs`.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(timeout_secs),
        }
    }

    /// Verify both binaries are on PATH.
    pub fn check_available() -> MediaResult<()> {
        check_ffmpeg()?;
        check_ffprobe()?;
        Ok(())
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        probe_media(path).await
    }

    async fn trim(
        &self,
        input: &Path,
        output: &Path,
        interval: &EngagingInterval,
        profile: &EncodingProfile,
        keep_audio: bool,
    ) -> MediaResult<TrimmedMedia> {
        trim_to_interval(&self.runner, input, output, interval, profile, keep_audio).await
    }

    async fn render_audio(&self, request: &AudioRenderRequest, output: &Path) -> MediaResult<MixedAudio> {
        render_mix(&self.runner, request, output).await
    }

    async fn assemble(&self, request: &AssemblyRequest, output: &Path) -> MediaResult<f64> {
        assemble_reel(&self.runner, request, output).await
    }
}
