//! Minimal loripsum.net client.
//!
//! This crate fetches placeholder paragraphs from the loripsum API:
//! - Plain-text paragraphs in three size classes
//! - Configurable base URL and timeouts
//! - Typed errors for network, timeout and API failures

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "http://loripsum.net/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when fetching placeholder text.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Paragraph count must be at least 1")]
    InvalidParagraphs,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Network(e.to_string())
        }
    }
}

/// Paragraph length class understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphSize {
    #[default]
    Small,
    Medium,
    Large,
}

impl ParagraphSize {
    /// All size classes, in API order.
    pub const ALL: [ParagraphSize; 3] = [
        ParagraphSize::Small,
        ParagraphSize::Medium,
        ParagraphSize::Large,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParagraphSize::Small => "small",
            ParagraphSize::Medium => "medium",
            ParagraphSize::Large => "large",
        }
    }

    /// Size class by index into [`ParagraphSize::ALL`].
    pub fn from_index(index: usize) -> Option<ParagraphSize> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for ParagraphSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParagraphSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "small" => Ok(ParagraphSize::Small),
            "medium" => Ok(ParagraphSize::Medium),
            "large" => Ok(ParagraphSize::Large),
            other => Err(Error::Config(format!("unknown paragraph size: {other}"))),
        }
    }
}

/// loripsum.net API client.
#[derive(Clone)]
pub struct Loripsum {
    client: reqwest::Client,
    base_url: String,
}

impl Loripsum {
    /// Create a client against the public API.
    pub fn new() -> Result<Self, Error> {
        Self::with_base_url(API_BASE)
    }

    /// Create a client against a different API root (e.g. a local mirror).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL for a plain-text request of `paragraphs` paragraphs.
    pub fn url_for(&self, paragraphs: u32, size: ParagraphSize) -> String {
        format!("{}/{}/{}/plaintext", self.base_url, paragraphs, size)
    }

    /// Fetch `paragraphs` paragraphs of placeholder text.
    pub async fn paragraphs(&self, paragraphs: u32, size: ParagraphSize) -> Result<String, Error> {
        if paragraphs == 0 {
            return Err(Error::InvalidParagraphs);
        }

        let response = self.client.get(self.url_for(paragraphs, size)).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.text().await?)
    }
}
