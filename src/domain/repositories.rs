//! Trait definitions for the pipeline's side effects
//!
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use std::time::Duration;

use super::record::SourceName;

/// Cache key for a fully-resolved GET request.
pub fn request_key(url: &str) -> String {
    format!("GET {}", url)
}

/// Persistent store of raw response bodies keyed by the exact outbound request.
///
/// Writes are idempotent upserts, so two callers racing on the same key are
/// harmless. Expired entries read as absent.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Look up a non-expired body
    async fn get(&self, request_key: &str) -> Result<Option<Vec<u8>>, sea_orm::DbErr>;

    /// Insert or replace a body, stamping it with the current time
    async fn put(&self, request_key: &str, body: &[u8]) -> Result<(), sea_orm::DbErr>;
}

/// Every wall-clock wait of the pipeline goes through this gate, so tests can
/// swap in a zero-delay double.
#[async_trait]
pub trait SchedulingGate: Send + Sync {
    /// Block while `source` is inside a maintenance window.
    async fn wait_if_needed(&self, source: SourceName);

    /// Backoff, pacing and per-record pauses.
    async fn sleep(&self, duration: Duration);
}
