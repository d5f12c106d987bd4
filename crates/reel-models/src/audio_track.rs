//! Background audio track references.
//!
//! Callers pick a track either from the built-in catalog, from their own
//! uploads (`custom_<file>`), or by raw storage key.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Storage prefix for built-in and custom music.
pub const MUSIC_PREFIX: &str = "highlightMusic";

/// Built-in track identifiers.
pub const BUILTIN_TRACKS: &[&str] = &[
    "hiphop_vibes",
    "rock_anthem",
    "cinematic_theme",
    "funky_groove",
];

/// A reference to a background audio track as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AudioTrackRef(pub String);

impl AudioTrackRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve to a storage key, or `None` for an unknown catalog id.
    pub fn storage_key(&self) -> Option<String> {
        let value = self.0.trim();
        if value.is_empty() {
            return None;
        }
        if let Some(name) = value.strip_prefix("custom_") {
            if name.is_empty() || name.contains("..") {
                return None;
            }
            return Some(format!("{}/custom/{}", MUSIC_PREFIX, name));
        }
        if value.contains('/') {
            return Some(value.to_string());
        }
        BUILTIN_TRACKS
            .iter()
            .find(|id| **id == value)
            .map(|id| format!("{}/{}.mp3", MUSIC_PREFIX, id))
    }
}

impl std::fmt::Display for AudioTrackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
