//! Final reel assembly.
//!
//! All clips are normalized to the profile frame and concatenated with the
//! `concat` filter in a single encode; the rendered audio bed (or generated
//! silence) is mapped as the only audio stream.

use std::path::{Path, PathBuf};
use tracing::info;

use reel_models::encoding::AUDIO_SAMPLE_RATE;
use reel_models::EncodingProfile;

use crate::audio::MixedAudio;
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;

/// One clip in reel order.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyClip {
    pub path: PathBuf,
    pub duration: f64,
}

/// Inputs to a reel encode.
#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    /// Clips, already sorted by index
    pub clips: Vec<AssemblyClip>,
    pub audio: MixedAudio,
    pub profile: EncodingProfile,
}

impl AssemblyRequest {
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.duration).sum()
    }
}

/// Build the video half of the filter graph, ending in `[outv]`.
pub fn build_concat_filter(clip_count: usize, profile: &EncodingProfile) -> String {
    let (width, height) = profile.frame_size();
    let mut parts: Vec<String> = (0..clip_count)
        .map(|i| {
            format!(
                "[{i}:v:0]scale={w}:{h}:force_original_aspect_ratio=decrease,\
                 pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p[v{i}]",
                i = i,
                w = width,
                h = height,
                fps = profile.fps
            )
        })
        .collect();

    let labels: String = (0..clip_count).map(|i| format!("[v{}]", i)).collect();
    parts.push(format!("{}concat=n={}:v=1:a=0[outv]", labels, clip_count));
    parts.join(";")
}

/// Build the FFmpeg command for an assembly request.
pub fn build_assembly_command(request: &AssemblyRequest, output: &Path) -> MediaResult<FfmpegCommand> {
    if request.clips.is_empty() {
        return Err(MediaError::invalid_input("Cannot assemble a reel without clips"));
    }

    let mut cmd = FfmpegCommand::new(output);
    for clip in &request.clips {
        cmd = cmd.input_path(&clip.path);
    }

    let audio_input = request.clips.len();
    cmd = match &request.audio {
        MixedAudio::Track(path) => cmd.input_path(path),
        MixedAudio::Silence => cmd.lavfi(format!("anullsrc=r={}:cl=stereo", AUDIO_SAMPLE_RATE)),
    };

    let cmd = cmd
        .filter_complex(build_concat_filter(request.clips.len(), &request.profile))
        .map("[outv]")
        .map(format!("{}:a:0", audio_input))
        .video_encoding(&request.profile)
        .audio_encoding(&request.profile)
        .output_duration(request.total_duration())
        .faststart();

    Ok(cmd)
}

/// Encode the reel into `output` and return its measured duration.
pub async fn assemble_reel(
    runner: &FfmpegRunner,
    request: &AssemblyRequest,
    output: &Path,
) -> MediaResult<f64> {
    let cmd = build_assembly_command(request, output)?;

    info!(
        clips = request.clips.len(),
        total_duration = request.total_duration(),
        with_track = request.audio.path().is_some(),
        "Assembling reel -> {}",
        output.display()
    );
    runner.run(&cmd).await?;

    let probed = probe_media(output).await?;
    if !probed.has_video {
        return Err(MediaError::invalid_media("Assembled reel has no video stream"));
    }
    Ok(probed.duration.unwrap_or_else(|| request.total_duration()))
}
