//! The compiled reel returned to the caller.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Location of a successfully uploaded highlight reel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutputArtifact {
    /// Object storage key
    pub storage_key: String,
    /// URL the caller can hand out
    pub public_reference: String,
    /// Timeline length in seconds
    pub duration: f64,
    /// Number of clips in the timeline
    pub clip_count: usize,
}
