//! Domain error types
//!
//! Per-source errors (`FetchError`, `ParseError`, `LookupError`) are contained
//! at the source level. Only `PipelineError` aborts a batch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::record::SourceName;

/// Failure of one outbound request through the query executor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Every attempt timed out, retries exhausted
    #[error("{service} timed out after {attempts} attempts")]
    Timeout { service: SourceName, attempts: u32 },

    /// Non-2xx answer, never retried
    #[error("{service} returned HTTP {status}")]
    Http { service: SourceName, status: u16 },

    /// Transport failure other than a timeout, never retried
    #[error("{service} request failed: {message}")]
    Network { service: SourceName, message: String },

    /// The batch was aborted before the request could complete
    #[error("request cancelled")]
    Cancelled,

    /// The response cache could not be read or written
    #[error("response cache failure: {0}")]
    Storage(String),
}

impl FetchError {
    /// Errors that must abort the batch instead of staying with one source.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Cancelled | FetchError::Storage(_))
    }
}

impl From<sea_orm::DbErr> for FetchError {
    fn from(e: sea_orm::DbErr) -> Self {
        FetchError::Storage(e.to_string())
    }
}

/// The body was not well-formed markup or JSON.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed response: {0}")]
pub struct ParseError(pub String);

/// Anything that makes a single source's answer unusable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl LookupError {
    pub fn kind(&self) -> FailureKind {
        match self {
            LookupError::Fetch(FetchError::Timeout { .. }) => FailureKind::Timeout,
            LookupError::Fetch(FetchError::Http { .. }) => FailureKind::Http,
            LookupError::Fetch(FetchError::Network { .. }) => FailureKind::Network,
            LookupError::Fetch(FetchError::Cancelled) => FailureKind::Cancelled,
            LookupError::Fetch(FetchError::Storage(_)) => FailureKind::Storage,
            LookupError::Parse(_) => FailureKind::Parse,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, LookupError::Fetch(e) if e.is_fatal())
    }
}

/// Serializable classification of a per-source failure, kept on `SourceResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Http,
    Network,
    Parse,
    Cancelled,
    Storage,
}

/// Errors fatal to the whole batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("response cache unavailable: {0}")]
    Cache(String),

    #[error("batch cancelled after {completed} records")]
    Cancelled { completed: usize },

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<sea_orm::DbErr> for PipelineError {
    fn from(e: sea_orm::DbErr) -> Self {
        PipelineError::Cache(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{0}' in input header")]
    MissingColumn(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}
