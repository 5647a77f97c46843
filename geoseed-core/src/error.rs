//! Top-level error type for a seeding run.

use crate::content::ContentError;
use crate::sampler::SampleError;
use crate::store::StoreError;
use crate::walker::WalkError;
use thiserror::Error;

/// Errors that end a seeding run.
///
/// Nothing here is retried: the run stops at the first failure and leaves
/// whatever was already written in place.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Content source error: {0}")]
    Content(#[from] ContentError),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("Day {0} days ago has no 08:00 in the local timezone")]
    Clock(u64),
}

impl SeedError {
    pub fn config(message: impl Into<String>) -> Self {
        SeedError::Config(message.into())
    }
}
