//! Resilient query executor
//!
//! Every outbound request goes through here: response cache first, then the
//! maintenance-window gate, a bounded request with retry on timeout, and a
//! per-service pause after each network round-trip.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::domain::{FetchError, ResponseStore, SchedulingGate, SourceName, request_key};
use crate::infrastructure::ExecutorConfig;

/// Per-service request counters, for the end-of-batch summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub cache_hits: u64,
    pub network_calls: u64,
    pub retries: u64,
    pub failures: u64,
}

/// Outcome of a single HTTP attempt.
enum Attempt {
    TimedOut,
    Failed(FetchError),
}

pub struct QueryExecutor {
    client: reqwest::Client,
    config: ExecutorConfig,
    cache: Arc<dyn ResponseStore>,
    gate: Arc<dyn SchedulingGate>,
    cancel: CancellationToken,
    /// One in-flight request per service
    locks: HashMap<SourceName, Mutex<()>>,
    stats: DashMap<SourceName, FetchStats>,
}

impl QueryExecutor {
    pub fn new(
        config: ExecutorConfig,
        cache: Arc<dyn ResponseStore>,
        gate: Arc<dyn SchedulingGate>,
        cancel: CancellationToken,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()?;

        let locks = SourceName::ALL
            .into_iter()
            .map(|source| (source, Mutex::new(())))
            .collect();

        Ok(Self {
            client,
            config,
            cache,
            gate,
            cancel,
            locks,
            stats: DashMap::new(),
        })
    }

    /// Fetch `url` on behalf of `source`, served from cache when possible.
    pub async fn fetch(&self, source: SourceName, url: &str) -> Result<Vec<u8>, FetchError> {
        self.ensure_active()?;

        let key = request_key(url);
        if let Some(body) = self.cache.get(&key).await? {
            tracing::debug!("{} cache hit: {}", source, url);
            self.record(source, |s| s.cache_hits += 1);
            return Ok(body);
        }

        let _guard = match self.locks.get(&source) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        // Another caller may have filled the entry while we waited for the lock
        if let Some(body) = self.cache.get(&key).await? {
            self.record(source, |s| s.cache_hits += 1);
            return Ok(body);
        }

        self.ensure_active()?;
        self.gate.wait_if_needed(source).await;
        self.ensure_active()?;

        tracing::debug!("{} cache miss, fetching: {}", source, url);
        let body = match self.fetch_with_retry(source, url).await {
            Ok(body) => body,
            Err(e) => {
                self.record(source, |s| s.failures += 1);
                return Err(e);
            }
        };

        self.cache.put(&key, &body).await?;

        let pause = self.config.pacing_for(source);
        self.ensure_active()?;
        self.gate.sleep(pause).await;

        Ok(body)
    }

    pub fn stats(&self, source: SourceName) -> FetchStats {
        self.stats.get(&source).map(|s| *s).unwrap_or_default()
    }

    pub fn log_summary(&self) {
        for source in SourceName::ALL {
            let s = self.stats(source);
            tracing::info!(
                "{}: {} network calls, {} cache hits, {} retries, {} failures",
                source,
                s.network_calls,
                s.cache_hits,
                s.retries,
                s.failures
            );
        }
    }

    async fn fetch_with_retry(&self, source: SourceName, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut retry = 0;
        loop {
            self.ensure_active()?;
            self.record(source, |s| s.network_calls += 1);

            match self.send(source, url).await {
                Ok(body) => return Ok(body),
                Err(Attempt::TimedOut) if retry < self.config.max_retries => {
                    let delay = self.config.backoff_for(retry);
                    tracing::warn!(
                        "{} timed out, retry {}/{} in {:?}",
                        source,
                        retry + 1,
                        self.config.max_retries,
                        delay
                    );
                    self.record(source, |s| s.retries += 1);
                    self.ensure_active()?;
                    self.gate.sleep(delay).await;
                    retry += 1;
                }
                Err(Attempt::TimedOut) => {
                    return Err(FetchError::Timeout {
                        service: source,
                        attempts: retry + 1,
                    });
                }
                Err(Attempt::Failed(e)) => return Err(e),
            }
        }
    }

    async fn send(&self, source: SourceName, url: &str) -> Result<Vec<u8>, Attempt> {
        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| classify(source, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(Attempt::Failed(FetchError::Http {
                    service: source,
                    status: status.as_u16(),
                }));
            }

            let bytes = response.bytes().await.map_err(|e| classify(source, e))?;
            Ok(bytes.to_vec())
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Err(Attempt::Failed(FetchError::Cancelled)),
            res = request => res,
        }
    }

    fn ensure_active(&self) -> Result<(), FetchError> {
        if self.cancel.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn record(&self, source: SourceName, update: impl FnOnce(&mut FetchStats)) {
        let mut entry = self.stats.entry(source).or_default();
        update(entry.value_mut());
    }
}

fn classify(source: SourceName, e: reqwest::Error) -> Attempt {
    if e.is_timeout() {
        Attempt::TimedOut
    } else if let Some(status) = e.status() {
        Attempt::Failed(FetchError::Http {
            service: source,
            status: status.as_u16(),
        })
    } else {
        Attempt::Failed(FetchError::Network {
            service: source,
            message: e.to_string(),
        })
    }
}
