//! Worker error types.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] reel_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] reel_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Fatal failure of a single clip after its retry.
#[derive(Debug, Clone, Error)]
#[error("clip {index} failed: {message}")]
pub struct ClipError {
    pub index: usize,
    pub message: String,
}

impl ClipError {
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}

/// Pipeline stage a compilation failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    ExtractingClips,
    MixingAudio,
    Assembling,
    Uploading,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validation => "validation",
            Stage::ExtractingClips => "extracting_clips",
            Stage::MixingAudio => "mixing_audio",
            Stage::Assembling => "assembling",
            Stage::Uploading => "uploading",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured failure returned by the compiler.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{stage} failed{}: {message}", clip_suffix(.clip_index))]
pub struct CompilationError {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_index: Option<usize>,
    pub message: String,
}

fn clip_suffix(clip_index: &Option<usize>) -> String {
    clip_index
        .map(|i| format!(" for clip {}", i))
        .unwrap_or_default()
}

impl CompilationError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            clip_index: None,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(Stage::Validation, message)
    }

    pub fn assembling(message: impl Into<String>) -> Self {
        Self::new(Stage::Assembling, message)
    }

    pub fn uploading(message: impl Into<String>) -> Self {
        Self::new(Stage::Uploading, message)
    }
}

impl From<ClipError> for CompilationError {
    fn from(err: ClipError) -> Self {
        Self {
            stage: Stage::ExtractingClips,
            clip_index: Some(err.index),
            message: err.message,
        }
    }
}
