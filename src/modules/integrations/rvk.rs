//! RVK classification label lookup via the Regensburg RVK API.
//!
//! The API answers with a node document, e.g. for `SU 680`:
//! `{"node": {"notation": "SU 680", "benennung": "IBM", ...}}`

use serde::Deserialize;

use crate::domain::{FetchError, LookupError, ParseError, SourceName, UNKNOWN_LABEL};
use crate::services::fetcher::QueryExecutor;

use super::catalog::Endpoint;

#[derive(Debug, Deserialize)]
struct RvkResponse {
    node: Option<RvkNode>,
}

#[derive(Debug, Deserialize)]
struct RvkNode {
    benennung: Option<String>,
}

/// Extract the label from an RVK node document.
///
/// Valid JSON without a label gives `None`; invalid JSON is a `ParseError`.
pub fn parse_label(body: &[u8]) -> Result<Option<String>, ParseError> {
    let parsed: RvkResponse = serde_json::from_slice(body)
        .map_err(|e| ParseError(format!("Failed to parse RVK JSON: {}", e)))?;

    Ok(parsed
        .node
        .and_then(|n| n.benennung)
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty()))
}

pub struct LabelResolver<'a> {
    executor: &'a QueryExecutor,
    endpoint: &'a Endpoint,
}

impl<'a> LabelResolver<'a> {
    pub fn new(executor: &'a QueryExecutor, endpoint: &'a Endpoint) -> Self {
        Self { executor, endpoint }
    }

    /// Resolve the label of `notation`.
    ///
    /// A missing label, and a label request that keeps timing out, both give
    /// the `"Unknown"` sentinel. HTTP and network errors are returned.
    pub async fn resolve_label(&self, notation: &str) -> Result<String, LookupError> {
        let url = self.endpoint.resolve_notation(notation);

        let body = match self.executor.fetch(SourceName::Rvk, &url).await {
            Ok(body) => body,
            Err(FetchError::Timeout { attempts, .. }) => {
                tracing::warn!(
                    "RVK label for '{}' timed out after {} attempts, using '{}'",
                    notation,
                    attempts,
                    UNKNOWN_LABEL
                );
                return Ok(UNKNOWN_LABEL.to_string());
            }
            Err(e) => return Err(e.into()),
        };

        match parse_label(&body)? {
            Some(label) => Ok(label),
            None => {
                tracing::warn!("RVK node '{}' has no label", notation);
                Ok(UNKNOWN_LABEL.to_string())
            }
        }
    }
}
