//! Services Layer
//!
//! Request execution, per-record source orchestration, consolidation and the
//! batch pipeline that ties them together.

pub mod consolidation;
pub mod fetcher;
pub mod lookup_service;
pub mod pipeline;

pub use consolidation::consolidate;
pub use fetcher::{FetchStats, QueryExecutor};
pub use lookup_service::SourceQueryOrchestrator;
pub use pipeline::BatchPipeline;
