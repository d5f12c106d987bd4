//! Quality profiles and the encoding parameters they expand to.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Output frame rate for every clip and the final reel
pub const OUTPUT_FPS: u32 = 30;
/// Audio sample rate used for generated silence and mixes
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Named quality tier selected once per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityProfile {
    /// Small, quick encodes for previews
    Fast,
    /// Balanced default
    #[default]
    Standard,
    /// Full HD, slow preset
    High,
}

impl QualityProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityProfile::Fast => "fast",
            QualityProfile::Standard => "standard",
            QualityProfile::High => "high",
        }
    }

    /// Expand the tier into concrete encoder settings.
    pub fn encoding(&self) -> EncodingProfile {
        match self {
            QualityProfile::Fast => EncodingProfile {
                preset: "veryfast".to_string(),
                crf: 28,
                audio_bitrate: "96k".to_string(),
                max_height: 480,
                ..Default::default()
            },
            QualityProfile::Standard => EncodingProfile::default(),
            QualityProfile::High => EncodingProfile {
                preset: "slow".to_string(),
                crf: 18,
                audio_bitrate: "192k".to_string(),
                max_height: 1080,
                ..Default::default()
            },
        }
    }
}

impl fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QualityProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(QualityProfile::Fast),
            "standard" => Ok(QualityProfile::Standard),
            "high" => Ok(QualityProfile::High),
            other => Err(format!("unknown quality profile: {}", other)),
        }
    }
}

/// Concrete encoder settings applied to every clip and the final reel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingProfile {
    /// Video codec (e.g., "libx264")
    pub codec: String,
    /// Encoding preset (e.g., "veryfast", "medium", "slow")
    pub preset: String,
    /// Constant Rate Factor (quality, 0-51, lower is better)
    pub crf: u8,
    /// Audio codec
    pub audio_codec: String,
    /// Audio bitrate
    pub audio_bitrate: String,
    /// Vertical resolution cap in pixels
    pub max_height: u32,
    /// Output frame rate
    pub fps: u32,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: "medium".to_string(),
            crf: 23,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: "128k".to_string(),
            max_height: 720,
            fps: OUTPUT_FPS,
        }
    }
}

impl EncodingProfile {
    /// Output frame size for the assembled reel (16:9, even dimensions).
    pub fn frame_size(&self) -> (u32, u32) {
        let height = self.max_height - self.max_height % 2;
        let width = height * 16 / 9;
        (width - width % 2, height)
    }

    /// Scale filter that caps height without upscaling smaller sources.
    pub fn height_cap_filter(&self) -> String {
        format!("scale=-2:'min(ih,{})'", self.max_height)
    }

    /// Video encoder arguments.
    pub fn video_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-r".to_string(),
            self.fps.to_string(),
        ]
    }

    /// Audio encoder arguments.
    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]
    }

    /// Duration of one output frame in seconds.
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.fps.max(1) as f64
    }
}
