use std::sync::Arc;
use std::time::Duration;

use rvk_shelfmark::domain::{FetchError, ResponseStore, SchedulingGate, SourceName};
use rvk_shelfmark::infrastructure::{ExecutorConfig, RecordingGate, SqliteResponseCache};
use rvk_shelfmark::services::QueryExecutor;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Helper to open an in-memory response cache
async fn memory_cache() -> Arc<SqliteResponseCache> {
    Arc::new(
        SqliteResponseCache::open("sqlite::memory:", chrono::Duration::days(30))
            .await
            .expect("Failed to open cache"),
    )
}

// Helper to build an executor over a recording gate
fn executor(
    config: ExecutorConfig,
    cache: Arc<SqliteResponseCache>,
    gate: Arc<RecordingGate>,
    cancel: CancellationToken,
) -> QueryExecutor {
    let store: Arc<dyn ResponseStore> = cache;
    let gate: Arc<dyn SchedulingGate> = gate;
    QueryExecutor::new(config, store, gate, cancel).expect("Failed to build executor")
}

#[tokio::test]
async fn test_persistent_timeout_backs_off_1_2_4_seconds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dnb"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<record/>")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let gate = Arc::new(RecordingGate::new());
    let config = ExecutorConfig {
        timeout: Duration::from_millis(100),
        ..Default::default()
    };
    let executor = executor(config, memory_cache().await, gate.clone(), CancellationToken::new());

    let url = format!("{}/dnb?query=isbn=1", server.uri());
    let err = executor.fetch(SourceName::Dnb, &url).await.unwrap_err();

    assert_eq!(
        err,
        FetchError::Timeout {
            service: SourceName::Dnb,
            attempts: 4
        }
    );
    assert_eq!(
        gate.sleeps(),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );

    let stats = executor.stats(SourceName::Dnb);
    assert_eq!(stats.network_calls, 4);
    assert_eq!(stats.retries, 3);
    assert_eq!(stats.failures, 1);
}

#[tokio::test]
async fn test_http_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slsp"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let gate = Arc::new(RecordingGate::new());
    let executor = executor(
        ExecutorConfig::default(),
        memory_cache().await,
        gate.clone(),
        CancellationToken::new(),
    );

    let url = format!("{}/slsp?query=isbn=1", server.uri());
    let err = executor.fetch(SourceName::Slsp, &url).await.unwrap_err();

    assert_eq!(
        err,
        FetchError::Http {
            service: SourceName::Slsp,
            status: 500
        }
    );
    // No backoff, and no pacing after a failed round-trip
    assert!(gate.sleeps().is_empty());
}

#[tokio::test]
async fn test_network_error_is_not_retried() {
    let gate = Arc::new(RecordingGate::new());
    let executor = executor(
        ExecutorConfig::default(),
        memory_cache().await,
        gate.clone(),
        CancellationToken::new(),
    );

    // Nothing listens on port 9 of localhost
    let err = executor
        .fetch(SourceName::B3Kat, "http://127.0.0.1:9/b3kat?query=isbn=1")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network { service: SourceName::B3Kat, .. }));
    assert!(gate.sleeps().is_empty());
    assert_eq!(executor.stats(SourceName::B3Kat).network_calls, 1);
}

#[tokio::test]
async fn test_cache_hit_skips_network_and_pacing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dnb"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<record/>"))
        .expect(1)
        .mount(&server)
        .await;

    let gate = Arc::new(RecordingGate::new());
    let executor = executor(
        ExecutorConfig::default(),
        memory_cache().await,
        gate.clone(),
        CancellationToken::new(),
    );
    let url = format!("{}/dnb?query=isbn=978-3-1", server.uri());

    let first = executor.fetch(SourceName::Dnb, &url).await.unwrap();
    assert_eq!(first, b"<record/>");
    assert_eq!(gate.sleeps(), vec![Duration::from_millis(1000)]);
    assert_eq!(gate.window_checks(), vec![SourceName::Dnb]);

    gate.clear();
    let second = executor.fetch(SourceName::Dnb, &url).await.unwrap();
    assert_eq!(second, first);
    assert!(gate.sleeps().is_empty());
    assert!(gate.window_checks().is_empty());
    assert_eq!(executor.stats(SourceName::Dnb).cache_hits, 1);
    assert_eq!(executor.stats(SourceName::Dnb).network_calls, 1);
}

#[tokio::test]
async fn test_label_service_uses_its_own_pacing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rvk/AB+123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let gate = Arc::new(RecordingGate::new());
    let executor = executor(
        ExecutorConfig::default(),
        memory_cache().await,
        gate.clone(),
        CancellationToken::new(),
    );

    let url = format!("{}/rvk/AB+123?json", server.uri());
    executor.fetch(SourceName::Rvk, &url).await.unwrap();
    assert_eq!(gate.sleeps(), vec![Duration::from_millis(500)]);
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/b3kat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<record>persisted</record>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("cache.db").display());
    let url = format!("{}/b3kat?query=isbn=978-3-1", server.uri());

    {
        let cache = Arc::new(
            SqliteResponseCache::open(&db_url, chrono::Duration::days(30))
                .await
                .unwrap(),
        );
        let gate = Arc::new(RecordingGate::new());
        let executor = executor(
            ExecutorConfig::default(),
            cache.clone(),
            gate,
            CancellationToken::new(),
        );
        executor.fetch(SourceName::B3Kat, &url).await.unwrap();
        drop(executor);

        let cache = Arc::try_unwrap(cache).ok().expect("cache still shared");
        cache.close().await.unwrap();
    }

    let cache = Arc::new(
        SqliteResponseCache::open(&db_url, chrono::Duration::days(30))
            .await
            .unwrap(),
    );
    let gate = Arc::new(RecordingGate::new());
    let executor = executor(
        ExecutorConfig::default(),
        cache,
        gate.clone(),
        CancellationToken::new(),
    );

    let body = executor.fetch(SourceName::B3Kat, &url).await.unwrap();
    assert_eq!(body, b"<record>persisted</record>");
    assert!(gate.sleeps().is_empty());
}

#[tokio::test]
async fn test_cancelled_executor_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let gate = Arc::new(RecordingGate::new());
    let executor = executor(ExecutorConfig::default(), memory_cache().await, gate, cancel);

    let url = format!("{}/dnb?query=isbn=1", server.uri());
    let err = executor.fetch(SourceName::Dnb, &url).await.unwrap_err();
    assert_eq!(err, FetchError::Cancelled);
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_cancel_interrupts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let gate = Arc::new(RecordingGate::new());
    let executor = executor(
        ExecutorConfig::default(),
        memory_cache().await,
        gate,
        cancel.clone(),
    );

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let url = format!("{}/dnb?query=isbn=1", server.uri());
    let started = std::time::Instant::now();
    let err = executor.fetch(SourceName::Dnb, &url).await.unwrap_err();

    assert_eq!(err, FetchError::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}
