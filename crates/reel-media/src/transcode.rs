//! Interval trimming.
//!
//! Each source clip is cut to its engaging interval and re-encoded with the
//! job's encoding profile so every clip shares codec, frame rate and height
//! cap before assembly.

use std::path::Path;
use tracing::{debug, info};

use reel_models::{EncodingProfile, EngagingInterval};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;

/// Result of a trim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimmedMedia {
    /// Measured duration, or the requested span when the probe has none
    pub duration: f64,
    /// Whether the output carries an audio stream
    pub has_audio: bool,
}

/// Build the FFmpeg command for one trim.
pub fn build_trim_command(
    input: &Path,
    output: &Path,
    interval: &EngagingInterval,
    profile: &EncodingProfile,
    keep_audio: bool,
) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(output)
        .seek(interval.start)
        .duration(interval.duration())
        .input_path(input)
        .map("0:v:0")
        .video_filter(profile.height_cap_filter())
        .video_encoding(profile);

    let cmd = if keep_audio {
        // `?` keeps sources without an audio stream encodable.
        cmd.map("0:a:0?").audio_encoding(profile)
    } else {
        cmd.no_audio()
    };

    cmd.faststart()
}

/// Trim `input` to `interval` and re-encode it into `output`.
pub async fn trim_to_interval(
    runner: &FfmpegRunner,
    input: &Path,
    output: &Path,
    interval: &EngagingInterval,
    profile: &EncodingProfile,
    keep_audio: bool,
) -> MediaResult<TrimmedMedia> {
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    info!(
        "Trimming {} [{:.2}s, {:.2}s) -> {}",
        input.display(),
        interval.start,
        interval.end,
        output.display()
    );

    let cmd = build_trim_command(input, output, interval, profile, keep_audio);
    runner.run(&cmd).await?;

    if !output.exists() {
        return Err(MediaError::invalid_media(format!(
            "Trim produced no output at {}",
            output.display()
        )));
    }

    let info = probe_media(output).await?;
    if !info.has_video {
        return Err(MediaError::invalid_media("Trimmed clip has no video stream"));
    }

    let duration = info.duration.unwrap_or_else(|| interval.duration());
    debug!(
        output = %output.display(),
        duration,
        has_audio = info.has_audio,
        "Trim complete"
    );

    Ok(TrimmedMedia {
        duration,
        has_audio: keep_audio && info.has_audio,
    })
}
