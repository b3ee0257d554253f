//! Batch pipeline
//!
//! Drives lookup, consolidation and call-number synthesis over an ordered
//! input batch. Exactly one output record per input record, in input order.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::{
    InputRecord, OutputRecord, PipelineError, ResponseStore, SchedulingGate, SourceLookup,
};
use crate::infrastructure::{Config, SqliteResponseCache};
use crate::modules::cataloguing_pro::synthesize_call_number;

use super::consolidation::consolidate;
use super::fetcher::QueryExecutor;
use super::lookup_service::SourceQueryOrchestrator;

pub struct BatchPipeline {
    orchestrator: SourceQueryOrchestrator,
    cache: Arc<SqliteResponseCache>,
    cancel: CancellationToken,
}

impl BatchPipeline {
    /// Open the response cache and wire up the executor and orchestrator.
    pub async fn open(
        config: &Config,
        gate: Arc<dyn SchedulingGate>,
        cancel: CancellationToken,
    ) -> Result<Self, PipelineError> {
        let cache = Arc::new(
            SqliteResponseCache::open(&config.cache_database_url, config.cache_ttl).await?,
        );
        tracing::debug!("Response cache opened at {}", config.cache_database_url);

        let store: Arc<dyn ResponseStore> = cache.clone();
        let executor = QueryExecutor::new(
            config.executor.clone(),
            store,
            gate.clone(),
            cancel.clone(),
        )
        .map_err(|e| PipelineError::Client(e.to_string()))?;

        let orchestrator = SourceQueryOrchestrator::new(
            Arc::new(executor),
            config.catalog.clone(),
            gate,
            config.record_pause,
        );

        Ok(Self {
            orchestrator,
            cache,
            cancel,
        })
    }

    /// Process every record in order. Per-source failures end up in the output;
    /// only cancellation or cache failure abort the batch.
    pub async fn run(&self, records: &[InputRecord]) -> Result<Vec<OutputRecord>, PipelineError> {
        let total = records.len();
        let mut outputs = Vec::with_capacity(total);

        for (index, record) in records.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(PipelineError::Cancelled { completed: index });
            }

            let output = match self.process_record(record).await {
                Ok(output) => output,
                Err(PipelineError::Cancelled { .. }) => {
                    return Err(PipelineError::Cancelled { completed: index });
                }
                Err(e) => return Err(e),
            };

            tracing::info!(
                "[{}/{}] ISBN {}: {} ({})",
                index + 1,
                total,
                output.isbn.as_deref().unwrap_or("-"),
                output.call_number.prefix.as_deref().unwrap_or("no call number"),
                if output.consolidated.cautions.is_empty() {
                    "ok".to_string()
                } else {
                    output.consolidated.cautions_text()
                }
            );
            outputs.push(output);
        }

        Ok(outputs)
    }

    /// Resolve one input record. A record without ISBN makes no network call.
    pub async fn process_record(&self, record: &InputRecord) -> Result<OutputRecord, PipelineError> {
        let isbn = record.isbn().map(str::to_string);

        let lookup = match &isbn {
            Some(isbn) => SourceLookup::Queried(self.orchestrator.lookup(isbn).await?),
            None => SourceLookup::NoIsbn,
        };

        let consolidated = consolidate(&lookup, record.title.as_deref());
        let call_number = synthesize_call_number(&consolidated, record.publication_date.as_deref());

        Ok(OutputRecord {
            isbn,
            consolidated,
            call_number,
            lookup,
        })
    }

    pub fn executor(&self) -> &QueryExecutor {
        self.orchestrator.executor()
    }

    /// Purge expired cache rows and close the cache.
    pub async fn finish(self) -> Result<(), PipelineError> {
        let BatchPipeline {
            orchestrator,
            cache,
            ..
        } = self;

        orchestrator.executor().log_summary();
        drop(orchestrator);

        let purged = cache.purge_expired().await?;
        if purged > 0 {
            tracing::info!("Purged {} expired cache entries", purged);
        }

        match Arc::try_unwrap(cache) {
            Ok(cache) => cache.close().await?,
            Err(_) => tracing::warn!("Response cache still in use, leaving it open"),
        }

        Ok(())
    }
}
