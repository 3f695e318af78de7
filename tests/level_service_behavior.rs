//! Behavior-driven tests for the level service
//!
//! These tests verify HOW a multi-instrument request behaves when sources
//! fail, when responses are cached, and when a client exceeds its limit.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use ibkit_core::{
    BarSource, BarsFuture, BarsRequest, CsvDirectorySource, InstrumentSymbol, KeyValueStore,
    LevelService, LevelsRequest, MemoryStore, SampleSource, ServiceConfig, ServiceError, Session,
    SourceError, UtcDateTime,
};

/// Sample bars for every instrument except the ones told to fail.
struct FlakySource {
    failing: Vec<&'static str>,
    calls: AtomicUsize,
}

impl FlakySource {
    fn new(failing: Vec<&'static str>) -> Self {
        Self {
            failing,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BarSource for FlakySource {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn bars<'a>(&'a self, req: BarsRequest) -> BarsFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&req.instrument.as_str()) {
                return Err(SourceError::unavailable(format!(
                    "{} feed is down",
                    req.instrument
                )));
            }
            Ok(SampleSource::default().generate(&req))
        })
    }
}

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
}

fn utc(value: &str) -> UtcDateTime {
    UtcDateTime::parse(value).expect("timestamp")
}

fn request(instruments: &str) -> LevelsRequest {
    LevelsRequest::new(
        InstrumentSymbol::parse_list(instruments).expect("symbols"),
        date("2024-01-02"),
        date("2024-01-03"),
        Session::NewYork,
    )
    .expect("request")
}

fn service(source: Arc<dyn BarSource>, config: ServiceConfig) -> LevelService {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new(config.cache_ttl));
    LevelService::new(source, store, config)
}

// =============================================================================
// Level Service: Failure Isolation
// =============================================================================

#[tokio::test]
async fn when_one_instrument_fails_the_others_still_return_levels() {
    // Given: A source where NQ is unavailable
    let source = Arc::new(FlakySource::new(vec!["NQ"]));
    let service = service(source, ServiceConfig::default());

    // When: User requests ES, NQ and GC
    let response = service
        .levels("client", &request("ES,NQ,GC"), utc("2024-01-04T15:00:00Z"))
        .await
        .expect("service call");

    // Then: ES and GC levels exist and NQ is reported as a failure
    assert!(response.is_partial());
    assert_eq!(response.failures.len(), 1);
    let failure = &response.failures[0];
    assert_eq!(failure.instrument.as_str(), "NQ");
    assert_eq!(failure.code, "source.unavailable");
    assert!(failure.retryable, "unavailable feeds can be retried");

    let mut reported: Vec<&str> = response
        .levels
        .iter()
        .map(|level| level.instrument.as_str())
        .collect();
    reported.sort_unstable();
    reported.dedup();
    assert_eq!(reported, vec!["ES", "GC"]);
    assert_eq!(response.levels.len(), 4, "two days for each healthy instrument");
}

#[tokio::test]
async fn when_a_csv_file_is_missing_that_instrument_is_not_found() {
    // Given: A data directory holding only ES bars
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("ES.csv"),
        "ts,open,high,low,close,volume\n\
         2024-01-02T14:30:00Z,4700,4710,4695,4705,1200\n\
         2024-01-02T14:45:00Z,4705,4712,4701,4709,900\n",
    )
    .expect("write bars");
    let source = Arc::new(CsvDirectorySource::new(dir.path()));
    let service = service(source, ServiceConfig::default());

    // When: User requests ES and NQ
    let response = service
        .levels("client", &request("ES,NQ"), utc("2024-01-04T15:00:00Z"))
        .await
        .expect("service call");

    // Then: ES has one day of levels and NQ failed as not found
    assert_eq!(response.levels.len(), 1);
    let level = &response.levels[0];
    assert_eq!(level.instrument.as_str(), "ES");
    assert_eq!(level.open, 4700.0);
    assert_eq!(level.close, 4709.0);
    assert_eq!(level.initial_balance.ib_15m_high(), 4710.0);
    assert_eq!(level.initial_balance.ib_1h_high(), 4712.0);
    assert_eq!(level.initial_balance.ib_1h_range(), 17.0);

    assert_eq!(response.failures.len(), 1);
    assert_eq!(response.failures[0].code, "source.not_found");
    assert!(!response.failures[0].retryable);
}

// =============================================================================
// Level Service: Caching
// =============================================================================

#[tokio::test]
async fn when_the_same_request_repeats_it_is_served_from_cache() {
    // Given: A healthy source
    let source = Arc::new(FlakySource::new(Vec::new()));
    let service = service(Arc::clone(&source) as Arc<dyn BarSource>, ServiceConfig::default());
    let req = request("ES,NQ");
    let now = utc("2024-01-04T15:00:00Z");

    // When: User makes the same request twice
    let first = service.levels("client", &req, now).await.expect("first");
    let second = service.levels("client", &req, now).await.expect("second");

    // Then: The second response is the cached copy and the source is not hit again
    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(first.levels, second.levels);
    assert_eq!(source.calls(), 2, "one fetch per instrument");
}

#[tokio::test]
async fn when_a_response_is_partial_it_is_not_cached() {
    let source = Arc::new(FlakySource::new(vec!["NQ"]));
    let service = service(Arc::clone(&source) as Arc<dyn BarSource>, ServiceConfig::default());
    let req = request("ES,NQ");
    let now = utc("2024-01-04T15:00:00Z");

    let first = service.levels("client", &req, now).await.expect("first");
    let second = service.levels("client", &req, now).await.expect("second");

    assert!(first.is_partial());
    assert!(!second.cache_hit);
    assert!(second.is_partial());
    assert_eq!(source.calls(), 4);
}

#[tokio::test]
async fn when_a_session_closes_after_caching_the_entry_is_rebuilt() {
    // Given: Levels cached before Wednesday's New York close
    let source = Arc::new(FlakySource::new(Vec::new()));
    let service = service(Arc::clone(&source) as Arc<dyn BarSource>, ServiceConfig::default());
    let req = request("ES");
    service
        .levels("client", &req, utc("2024-01-03T15:00:00Z"))
        .await
        .expect("first");

    // When: The same request arrives after 16:00 ET (21:00Z)
    let after_close = service
        .levels("client", &req, utc("2024-01-03T21:05:00Z"))
        .await
        .expect("after close");

    // Then: The stale entry is dropped and bars are fetched again
    assert!(!after_close.cache_hit);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn when_caching_is_disabled_every_request_fetches() {
    let source = Arc::new(FlakySource::new(Vec::new()));
    let config = ServiceConfig {
        cache_ttl: std::time::Duration::ZERO,
        ..ServiceConfig::default()
    };
    let service = service(Arc::clone(&source) as Arc<dyn BarSource>, config);
    let req = request("ES");
    let now = utc("2024-01-04T15:00:00Z");

    service.levels("client", &req, now).await.expect("first");
    let second = service.levels("client", &req, now).await.expect("second");

    assert!(!second.cache_hit);
    assert_eq!(source.calls(), 2);
}

// =============================================================================
// Level Service: Rate Limiting
// =============================================================================

#[tokio::test]
async fn when_a_client_exceeds_its_limit_the_request_is_rejected() {
    // Given: A limit of one request per minute
    let config = ServiceConfig {
        rate_limit: 1,
        ..ServiceConfig::default()
    };
    let service = service(Arc::new(FlakySource::new(Vec::new())), config).with_rate_limit();
    let req = request("ES");
    let now = utc("2024-01-04T15:00:00Z");

    // When: The same client asks twice within the window
    service.levels("alice", &req, now).await.expect("first");
    let second = service.levels("alice", &req, now).await;

    // Then: The second request is rate limited with a reset time
    match second {
        Err(ServiceError::RateLimited { limit, reset_at }) => {
            assert_eq!(limit, 1);
            assert_eq!(reset_at, utc("2024-01-04T15:01:00Z"));
        }
        other => panic!("expected rate limit, got {other:?}"),
    }

    // And: Another client is unaffected
    assert!(service.levels("bob", &req, now).await.is_ok());
}

#[tokio::test]
async fn when_caching_is_disabled_the_rate_limit_still_applies() {
    // Given: No response caching and a limit of one request per minute
    let config = ServiceConfig {
        cache_ttl: std::time::Duration::ZERO,
        rate_limit: 1,
        ..ServiceConfig::default()
    };
    let service = service(Arc::new(FlakySource::new(Vec::new())), config).with_rate_limit();
    let req = request("ES");
    let now = utc("2024-01-04T15:00:00Z");

    // When: The same client asks twice within the window
    let first = service.levels("alice", &req, now).await;
    let second = service.levels("alice", &req, now).await;

    // Then: The window is still counted and the second request is rejected
    assert!(first.is_ok());
    assert!(
        matches!(second, Err(ServiceError::RateLimited { limit: 1, .. })),
        "second request should be rate limited, got {second:?}"
    );
}
