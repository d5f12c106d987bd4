//! Audio bed rendering for the assembled reel.
//!
//! The original-audio bed is the per-clip audio laid end to end, with
//! generated silence standing in for clips that have no audio stream so
//! the bed stays aligned with the video timeline. A background track is
//! looped whole, trimmed to the timeline length and summed with the bed.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use reel_models::encoding::AUDIO_SAMPLE_RATE;
use reel_models::{EncodingProfile, VolumeSpec};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Audio contribution of one trimmed clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipAudio {
    /// Trimmed clip file
    pub path: PathBuf,
    /// Whether the clip carries an audio stream
    pub has_audio: bool,
    /// Clip duration in seconds
    pub duration: f64,
}

/// A fetched background track.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundTrack {
    /// Local audio file
    pub path: PathBuf,
    /// Track duration in seconds
    pub duration: f64,
}

/// How the reel's audio is produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MixPlan {
    /// No audible source; the reel gets generated silence
    Silence,
    /// Clip audio only
    OriginalOnly { gain: f32 },
    /// Background track only
    BackgroundOnly { gain: f32, extra_loops: u32 },
    /// Clip audio summed with the background track
    Blend {
        original_gain: f32,
        music_gain: f32,
        extra_loops: u32,
    },
}

impl MixPlan {
    pub fn uses_background(&self) -> bool {
        matches!(self, MixPlan::BackgroundOnly { .. } | MixPlan::Blend { .. })
    }

    pub fn uses_original(&self) -> bool {
        matches!(self, MixPlan::OriginalOnly { .. } | MixPlan::Blend { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            MixPlan::Silence => "silence",
            MixPlan::OriginalOnly { .. } => "original_only",
            MixPlan::BackgroundOnly { .. } => "background_only",
            MixPlan::Blend { .. } => "blend",
        }
    }
}

/// Rendered audio for the assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum MixedAudio {
    /// Rendered track covering the full timeline
    Track(PathBuf),
    /// Nothing rendered; the assembler generates silence
    Silence,
}

impl MixedAudio {
    pub fn path(&self) -> Option<&Path> {
        match self {
            MixedAudio::Track(p) => Some(p),
            MixedAudio::Silence => None,
        }
    }
}

/// Everything needed to render one audio bed.
#[derive(Debug, Clone)]
pub struct AudioRenderRequest {
    pub plan: MixPlan,
    pub clips: Vec<ClipAudio>,
    pub background: Option<BackgroundTrack>,
    pub total_duration: f64,
    pub profile: EncodingProfile,
}

/// Sum of clip durations.
pub fn total_duration(clips: &[ClipAudio]) -> f64 {
    clips.iter().map(|c| c.duration).sum()
}

/// Additional whole-track repetitions needed to cover `total` seconds.
///
/// `ceil(total / track) - 1`, never negative.
pub fn loop_count(total: f64, track: f64) -> u32 {
    if !(track > 0.0) || !(total > 0.0) {
        return 0;
    }
    let repeats = (total / track - 1e-9).ceil();
    (repeats as u32).saturating_sub(1)
}

/// Decide the audio plan from stream availability and volumes.
pub fn plan_mix(
    clips: &[ClipAudio],
    background_duration: Option<f64>,
    volumes: &VolumeSpec,
) -> MixPlan {
    let total = total_duration(clips);
    if !(total > 0.0) {
        return MixPlan::Silence;
    }

    let original = volumes.keeps_original_audio() && clips.iter().any(|c| c.has_audio);
    let background = background_duration
        .filter(|d| *d > 0.0 && volumes.wants_music())
        .map(|d| loop_count(total, d));

    match (original, background) {
        (false, None) => MixPlan::Silence,
        (true, None) => MixPlan::OriginalOnly {
            gain: volumes.original_volume,
        },
        (false, Some(extra_loops)) => MixPlan::BackgroundOnly {
            gain: volumes.music_volume,
            extra_loops,
        },
        (true, Some(extra_loops)) => MixPlan::Blend {
            original_gain: volumes.original_volume,
            music_gain: volumes.music_volume,
            extra_loops,
        },
    }
}

fn normalize_chain() -> String {
    format!(
        "aresample={},aformat=sample_fmts=fltp:channel_layouts=stereo",
        AUDIO_SAMPLE_RATE
    )
}

/// Filter graph segment producing `[orig]` from the clip audio.
///
/// `first_input` is the index of the first clip input; only clips with
/// audio are inputs, in order.
pub fn build_original_bed_filter(clips: &[ClipAudio], first_input: usize, gain: f32) -> String {
    let mut parts = Vec::with_capacity(clips.len() + 1);
    let mut input = first_input;

    for (i, clip) in clips.iter().enumerate() {
        if clip.has_audio {
            parts.push(format!(
                "[{}:a:0]{},atrim=duration={:.3},apad=whole_dur={:.3},asetpts=PTS-STARTPTS[c{}]",
                input,
                normalize_chain(),
                clip.duration,
                clip.duration,
                i
            ));
            input += 1;
        } else {
            parts.push(format!(
                "anullsrc=r={}:cl=stereo,atrim=duration={:.3}[c{}]",
                AUDIO_SAMPLE_RATE, clip.duration, i
            ));
        }
    }

    let labels: String = (0..clips.len()).map(|i| format!("[c{}]", i)).collect();
    parts.push(format!(
        "{}concat=n={}:v=0:a=1,volume={:.3}[orig]",
        labels,
        clips.len(),
        gain
    ));
    parts.join(";")
}

/// Filter graph segment producing `[bg]` from a looped background input.
pub fn build_background_filter(input: usize, total: f64, gain: f32) -> String {
    format!(
        "[{}:a:0]{},atrim=duration={:.3},asetpts=PTS-STARTPTS,volume={:.3}[bg]",
        input,
        normalize_chain(),
        total,
        gain
    )
}

/// Build the FFmpeg command for a render request.
///
/// Returns `None` for [`MixPlan::Silence`].
pub fn build_mix_command(request: &AudioRenderRequest, output: &Path) -> MediaResult<Option<FfmpegCommand>> {
    let mut cmd = FfmpegCommand::new(output);
    let mut graph = Vec::new();
    let mut next_input = 0;

    if request.plan.uses_original() {
        for clip in request.clips.iter().filter(|c| c.has_audio) {
            cmd = cmd.input_path(&clip.path);
        }
    }

    let out_label = match request.plan {
        MixPlan::Silence => return Ok(None),
        MixPlan::OriginalOnly { gain } => {
            graph.push(build_original_bed_filter(&request.clips, next_input, gain));
            "[orig]"
        }
        MixPlan::BackgroundOnly { gain, extra_loops } => {
            let bg = background(request)?;
            cmd = cmd.stream_loop(extra_loops).input_path(&bg.path);
            graph.push(build_background_filter(next_input, request.total_duration, gain));
            "[bg]"
        }
        MixPlan::Blend {
            original_gain,
            music_gain,
            extra_loops,
        } => {
            let bg = background(request)?;
            graph.push(build_original_bed_filter(&request.clips, next_input, original_gain));
            next_input += request.clips.iter().filter(|c| c.has_audio).count();
            cmd = cmd.stream_loop(extra_loops).input_path(&bg.path);
            graph.push(build_background_filter(next_input, request.total_duration, music_gain));
            graph.push("[orig][bg]amix=inputs=2:normalize=0:duration=longest[mix]".to_string());
            "[mix]"
        }
    };

    let cmd = cmd
        .filter_complex(graph.join(";"))
        .map(out_label)
        .output_args(["-ar".to_string(), AUDIO_SAMPLE_RATE.to_string()])
        .audio_encoding(&request.profile)
        .output_duration(request.total_duration);

    Ok(Some(cmd))
}

fn background(request: &AudioRenderRequest) -> MediaResult<&BackgroundTrack> {
    request
        .background
        .as_ref()
        .ok_or_else(|| MediaError::invalid_input("Mix plan requires a background track"))
}

/// Render the audio bed into `output`.
pub async fn render_mix(
    runner: &FfmpegRunner,
    request: &AudioRenderRequest,
    output: &Path,
) -> MediaResult<MixedAudio> {
    let Some(cmd) = build_mix_command(request, output)? else {
        debug!("Mix plan is silence, nothing to render");
        return Ok(MixedAudio::Silence);
    };

    info!(
        plan = request.plan.name(),
        total_duration = request.total_duration,
        clips = request.clips.len(),
        "Rendering audio bed"
    );
    runner.run(&cmd).await?;

    if !output.exists() {
        return Err(MediaError::invalid_media("Audio render produced no output"));
    }
    Ok(MixedAudio::Track(output.to_path_buf()))
}
