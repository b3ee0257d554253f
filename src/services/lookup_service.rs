//! Source query orchestrator
//!
//! Queries every configured catalogue for one ISBN, in fixed order, and
//! resolves a label for each RVK notation found. A failing source is
//! recorded and skipped; only cancellation and cache failure escape.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    ClassificationCode, LookupError, PipelineError, SchedulingGate, SourceName, SourceResult,
};
use crate::modules::cataloguing_pro::classification::validate_rvk;
use crate::modules::integrations::{EndpointCatalog, LabelResolver, sru};

use super::fetcher::QueryExecutor;

pub struct SourceQueryOrchestrator {
    executor: Arc<QueryExecutor>,
    catalog: EndpointCatalog,
    gate: Arc<dyn SchedulingGate>,
    record_pause: Duration,
}

impl SourceQueryOrchestrator {
    pub fn new(
        executor: Arc<QueryExecutor>,
        catalog: EndpointCatalog,
        gate: Arc<dyn SchedulingGate>,
        record_pause: Duration,
    ) -> Self {
        Self {
            executor,
            catalog,
            gate,
            record_pause,
        }
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    /// Query all sources for `isbn`, then pause before returning.
    pub async fn lookup(&self, isbn: &str) -> Result<Vec<SourceResult>, PipelineError> {
        let mut results = Vec::new();
        // Labels already resolved for this record, shared across sources
        let mut labels: HashMap<String, String> = HashMap::new();

        for source in self.catalog.bibliographic_sources() {
            let result = match self.query_source(source, isbn, &mut labels).await {
                Ok(result) => result,
                Err(e) if e.is_fatal() => return Err(fatal(e)),
                Err(e) => {
                    tracing::warn!("{} lookup for ISBN {} failed: {}", source, isbn, e);
                    SourceResult::failed(source, &e)
                }
            };
            results.push(result);
        }

        self.gate.sleep(self.record_pause).await;

        Ok(results)
    }

    async fn query_source(
        &self,
        source: SourceName,
        isbn: &str,
        labels: &mut HashMap<String, String>,
    ) -> Result<SourceResult, LookupError> {
        let Some(endpoint) = self.catalog.get(source) else {
            return Ok(SourceResult::found(source, None, None, Vec::new()));
        };

        let entry = sru::fetch_by_isbn(&self.executor, source, endpoint, isbn).await?;

        let mut codes = Vec::with_capacity(entry.notations.len());
        for notation in entry.notations {
            if !validate_rvk(&notation) {
                tracing::debug!("{} returned unusual RVK notation '{}'", source, notation);
            }
            let label = self.label_for(&notation, labels).await?;
            codes.push(ClassificationCode {
                notation,
                label,
            });
        }

        Ok(SourceResult::found(source, entry.title, entry.author, codes))
    }

    async fn label_for(
        &self,
        notation: &str,
        labels: &mut HashMap<String, String>,
    ) -> Result<Option<String>, LookupError> {
        if let Some(label) = labels.get(notation) {
            return Ok(Some(label.clone()));
        }

        let Some(endpoint) = self.catalog.get(SourceName::Rvk) else {
            return Ok(None);
        };

        let label = LabelResolver::new(&self.executor, endpoint)
            .resolve_label(notation)
            .await?;
        labels.insert(notation.to_string(), label.clone());
        Ok(Some(label))
    }
}

fn fatal(e: LookupError) -> PipelineError {
    match e {
        LookupError::Fetch(crate::domain::FetchError::Storage(msg)) => PipelineError::Cache(msg),
        _ => PipelineError::Cancelled { completed: 0 },
    }
}
