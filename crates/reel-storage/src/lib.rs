//! Object storage for highlight reels.
//!
//! Provides the [`ObjectStore`] trait used by the pipeline, an R2
//! (S3-compatible) implementation, and the storage key layout for staged
//! sources and finished reels.

pub mod client;
pub mod error;
pub mod store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use store::{
    output_key, public_url, staging_key, ObjectStore, OUTPUT_PREFIX, VIDEO_CONTENT_TYPE,
};
