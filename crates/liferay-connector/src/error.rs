//! Error types for the Liferay connector library.

use thiserror::Error;

/// Errors surfaced while fetching, decoding, or interpreting Liferay data
#[derive(Debug, Error)]
pub enum LiferayError {
    /// The HTTP exchange itself failed (network error or non-2xx status)
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// A response body could not be decoded as the expected JSON structure
    #[error("failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },

    /// A record lacks a field needed to derive its metadata
    #[error("record field `{field}` is {problem}")]
    Schema {
        field: &'static str,
        problem: &'static str,
    },

    /// Reading or writing the archive failed
    #[error("archive error: {0}")]
    Archive(String),

    /// The connector was constructed with unusable parameters
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl LiferayError {
    pub(crate) fn transport(url: &str, message: impl ToString) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn parse(url: &str, message: impl ToString) -> Self {
        Self::Parse {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn missing(field: &'static str) -> Self {
        Self::Schema {
            field,
            problem: "missing",
        }
    }
}

/// Result type for the connector library
pub type Result<T> = std::result::Result<T, LiferayError>;
