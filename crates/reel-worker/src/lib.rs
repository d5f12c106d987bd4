//! Highlight reel compilation worker.
//!
//! This crate provides:
//! - Interval selection with a Gemini-backed recommender
//! - Source fetching (HTTP or object storage) and optional staging
//! - Bounded parallel clip extraction with ordered results
//! - Audio mixing with background-track fallbacks
//! - Reel assembly, upload and the job orchestrator
//! - Configuration, structured logging and metrics

pub mod assembler;
pub mod compiler;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod interval;
pub mod logging;
pub mod metrics;
pub mod mixer;
pub mod source;
pub mod staging;

pub use compiler::{CompilationOutcome, Compiler, JobProgress};
pub use config::WorkerConfig;
pub use error::{ClipError, CompilationError, Stage, WorkerError, WorkerResult};
pub use extract::{ClipExtractor, ProcessedClip};
pub use gemini::{GeminiConfig, GeminiRecommender};
pub use interval::{IntervalRecommender, IntervalSelector, RecommendError, Selection, VideoReference};
pub use logging::JobLogger;
pub use staging::StagingLedger;
