//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use reel_models::EncodingProfile;

use crate::error::{MediaError, MediaResult};

/// Number of stderr lines kept in failure errors.
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg verbosity; failures are reported through the captured stderr tail.
const LOG_LEVEL: &str = "error";

/// One `-i` input together with the options that precede it.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegInput {
    /// Input arguments (before -i)
    pub args: Vec<String>,
    /// Path, URL, or lavfi source description
    pub source: String,
}

/// Builder for FFmpeg commands.
///
/// Input options (`seek`, `duration`, `stream_loop`, `lavfi`) are queued
/// and attached to the next input added, mirroring FFmpeg's own
/// command-line ordering.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Inputs in order
    inputs: Vec<FfmpegInput>,
    /// Options waiting for the next input
    pending_input_args: Vec<String>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            pending_input_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Add an input path or URL, consuming queued input options.
    pub fn input(mut self, source: impl Into<String>) -> Self {
        let args = std::mem::take(&mut self.pending_input_args);
        self.inputs.push(FfmpegInput {
            args,
            source: source.into(),
        });
        self
    }

    /// Add a local file input.
    pub fn input_path(self, path: impl AsRef<Path>) -> Self {
        let source = path.as_ref().to_string_lossy().to_string();
        self.input(source)
    }

    /// Add a lavfi-generated input (e.g. `anullsrc`).
    pub fn lavfi(mut self, description: impl Into<String>) -> Self {
        self.pending_input_args.push("-f".to_string());
        self.pending_input_args.push("lavfi".to_string());
        self.input(description)
    }

    /// Queue a raw input argument for the next input.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.pending_input_args.push(arg.into());
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Seek position for the next input.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Read duration for the next input.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    /// Repeat the next input `extra_loops` additional times.
    pub fn stream_loop(self, extra_loops: u32) -> Self {
        self.input_arg("-stream_loop").input_arg(extra_loops.to_string())
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Drop audio entirely from the output.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Apply the video encoder settings of a profile.
    pub fn video_encoding(self, profile: &EncodingProfile) -> Self {
        self.output_args(profile.video_args())
    }

    /// Apply the audio encoder settings of a profile.
    pub fn audio_encoding(self, profile: &EncodingProfile) -> Self {
        self.output_args(profile.audio_args())
    }

    /// Limit output duration.
    pub fn output_duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Move the moov atom to the front for progressive playback.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Number of inputs added so far.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Output path.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());
        args.push("-v".to_string());
        args.push(LOG_LEVEL.to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with a wall-clock timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command, killing it if the timeout elapses.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        if cmd.input_count() == 0 {
            return Err(MediaError::invalid_input("FFmpeg command has no inputs"));
        }

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));
        let started = Instant::now();

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::invalid_input("FFmpeg stderr not captured"))?;
        let stderr_handle = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let status = match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!("FFmpeg timed out after {} seconds, killing process", secs);
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(secs));
                }
            },
            None => child.wait().await?,
        };

        let stderr_output = stderr_handle.await.unwrap_or_default();

        if status.success() {
            debug!(
                output = %cmd.output_path().display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "FFmpeg finished"
            );
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr_tail(&stderr_output)),
                status.code(),
            ))
        }
    }
}

/// Keep only the last few stderr lines.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("output.mp4")
            .seek(10.0)
            .duration(5.0)
            .input("input.mp4")
            .video_encoding(&EncodingProfile::default())
            .no_audio();

        let args = cmd.build_args();
        let seek = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(seek < input, "seek must precede its input");
        assert_eq!(args[seek + 1], "10.000");
        assert!(args.contains(&"-an".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_input_options_attach_to_next_input() {
        let cmd = FfmpegCommand::new("mix.m4a")
            .input("a.m4a")
            .stream_loop(2)
            .input("music.mp3")
            .lavfi("anullsrc=r=44100:cl=stereo");

        let args = cmd.build_args();
        let inputs: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(inputs.len(), 3);

        let loop_pos = args.iter().position(|a| a == "-stream_loop").unwrap();
        assert!(loop_pos > inputs[0] && loop_pos < inputs[1]);
        assert_eq!(args[loop_pos + 1], "2");

        let lavfi_pos = args.iter().position(|a| a == "lavfi").unwrap();
        assert!(lavfi_pos > inputs[1] && lavfi_pos < inputs[2]);
        assert_eq!(cmd.input_count(), 3);
    }

    #[test]
    fn test_stderr_tail() {
        let noisy: String = (0..50).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&noisy);
        assert_eq!(tail.lines().count(), STDERR_TAIL_LINES);
        assert!(tail.ends_with("line 49"));
    }
}
