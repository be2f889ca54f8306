//! Error handling for the aggregation engine.
//!
//! A single error type is shared by every layer. The boundary only needs to
//! know which [`ErrorKind`] an error maps to and whether retrying can help.

use std::fmt;
use std::time::Duration;

use parquet::errors::ParquetError;
use serde::Serialize;

/// Specialized error type for the aggregation engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested region does not exist
    #[error("region '{region_id}' not found")]
    NotFound { region_id: String },

    /// The region exists but lies outside the caller's scope
    #[error("region '{region_id}' is outside scope '{scope}'")]
    Forbidden { region_id: String, scope: String },

    /// A request field could not be parsed or failed validation
    #[error("invalid {field}: {message}")]
    BadInput { field: String, message: String },

    /// Tenant configuration is missing a required mapping or is inconsistent
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transient failure talking to the record store
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    /// A store call did not finish within the configured timeout
    #[error("record store timed out after {0:?}")]
    Timeout(Duration),

    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error converting record batches into rows
    #[error("row conversion error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),

    /// Error parsing JSON documents
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else, usually an I/O chain carrying `anyhow` context
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of an [`Error`] as seen by the calling boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    BadRequest,
    Unavailable,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::Forbidden => "forbidden",
            Self::BadRequest => "bad request",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        };
        f.write_str(label)
    }
}

impl Error {
    /// Create a [`Error::BadInput`] for a named request field
    pub fn bad_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Boundary classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::BadInput { .. } => ErrorKind::BadRequest,
            Self::StoreUnavailable(_) | Self::Timeout(_) => ErrorKind::Unavailable,
            Self::Configuration(_)
            | Self::Io(_)
            | Self::Parquet(_)
            | Self::Arrow(_)
            | Self::SerdeArrow(_)
            | Self::Json(_)
            | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Whether a caller may retry the failed operation with backoff
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Timeout(_))
    }
}

/// Result type for aggregation engine operations
pub type Result<T> = std::result::Result<T, Error>;
