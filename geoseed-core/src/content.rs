//! Placeholder text for generated feeds and comments.

use async_trait::async_trait;
use loripsum::{Loripsum, ParagraphSize};
use thiserror::Error;

/// Errors from a content source.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Content source rejected request (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<loripsum::Error> for ContentError {
    fn from(e: loripsum::Error) -> Self {
        match e {
            loripsum::Error::Network(msg) => ContentError::Network(msg),
            loripsum::Error::Timeout(msg) => ContentError::Timeout(msg),
            loripsum::Error::Api { status, message } => ContentError::Api { status, message },
            other => ContentError::InvalidRequest(other.to_string()),
        }
    }
}

/// Supplies paragraphs of placeholder text.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn paragraphs(&self, count: u32, size: ParagraphSize) -> Result<String, ContentError>;
}

#[async_trait]
impl ContentSource for Loripsum {
    async fn paragraphs(&self, count: u32, size: ParagraphSize) -> Result<String, ContentError> {
        Ok(Loripsum::paragraphs(self, count, size).await?)
    }
}
