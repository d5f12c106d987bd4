//! Per-job volume settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default gain for each clip's own audio.
pub const DEFAULT_ORIGINAL_VOLUME: f32 = 1.0;
/// Default gain for the background track.
pub const DEFAULT_MUSIC_VOLUME: f32 = 0.5;

/// Independent gains for clip audio and background music, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    pub original_volume: f32,
    pub music_volume: f32,
}

impl Default for VolumeSpec {
    fn default() -> Self {
        Self {
            original_volume: DEFAULT_ORIGINAL_VOLUME,
            music_volume: DEFAULT_MUSIC_VOLUME,
        }
    }
}

impl VolumeSpec {
    pub fn new(original_volume: f32, music_volume: f32) -> Self {
        Self {
            original_volume,
            music_volume,
        }
    }

    /// Validate both gains.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("originalVolume", self.original_volume),
            ("musicVolume", self.music_volume),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0 and 1, got {}", name, value));
            }
        }
        Ok(())
    }

    /// Clip audio is only decoded when it will be audible.
    pub fn keeps_original_audio(&self) -> bool {
        self.original_volume > 0.0
    }

    /// Background music only matters when it will be audible.
    pub fn wants_music(&self) -> bool {
        self.music_volume > 0.0
    }
}
