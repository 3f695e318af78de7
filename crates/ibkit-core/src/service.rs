//! Level service: rate limit, cache, concurrent fetch and build.
//!
//! ```text
//! request ─▶ rate limiter ─▶ cache ──hit──▶ response
//!                              │
//!                             miss
//!                              ▼
//!            one task per instrument ─▶ BarSource
//!                              │
//!                              ▼
//!                     LevelBuilder ─▶ cache (complete responses only)
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bar_source::{BarSource, BarsRequest, SourceError};
use crate::boundary::has_session_closed_since;
use crate::cache::{cache_key, KeyValueStore};
use crate::calendar::SessionCalendar;
use crate::config::ServiceConfig;
use crate::levels::LevelBuilder;
use crate::rate_limit::RateLimiter;
use crate::{Bar, InstrumentSymbol, Session, TradingLevel, UtcDateTime, ValidationError};

const CACHE_PREFIX: &str = "levels";

/// Validated selection of instruments, dates and session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelsRequest {
    pub instruments: Vec<InstrumentSymbol>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub session: Session,
}

impl LevelsRequest {
    pub fn new(
        instruments: Vec<InstrumentSymbol>,
        start: NaiveDate,
        end: NaiveDate,
        session: Session,
    ) -> Result<Self, ValidationError> {
        if instruments.is_empty() {
            return Err(ValidationError::NoInstruments);
        }
        if end < start {
            return Err(ValidationError::InvertedDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            instruments,
            start,
            end,
            session,
        })
    }

    pub fn cache_key(&self) -> String {
        let instruments = self
            .instruments
            .iter()
            .map(InstrumentSymbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let mut params = BTreeMap::new();
        params.insert("instruments", instruments);
        params.insert("start", self.start.to_string());
        params.insert("end", self.end.to_string());
        params.insert("session", self.session.to_string());
        cache_key(CACHE_PREFIX, &params)
    }
}

/// A fetch that failed for one instrument; the others are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentFailure {
    pub instrument: InstrumentSymbol,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl InstrumentFailure {
    fn from_source(instrument: InstrumentSymbol, error: &SourceError) -> Self {
        Self {
            instrument,
            code: error.code().to_owned(),
            message: error.message().to_owned(),
            retryable: error.retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelsResponse {
    pub levels: Vec<TradingLevel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<InstrumentFailure>,
    pub cache_hit: bool,
}

impl LevelsResponse {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("rate limit of {limit} requests exceeded, retry after {reset_at}")]
    RateLimited { limit: u32, reset_at: UtcDateTime },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedLevels {
    stored_at: UtcDateTime,
    levels: Vec<TradingLevel>,
}

pub struct LevelService {
    source: Arc<dyn BarSource>,
    store: Arc<dyn KeyValueStore>,
    limiter: Option<RateLimiter>,
    calendar: SessionCalendar,
    config: ServiceConfig,
}

impl LevelService {
    pub fn new(
        source: Arc<dyn BarSource>,
        store: Arc<dyn KeyValueStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            source,
            store,
            limiter: None,
            calendar: SessionCalendar::default(),
            config,
        }
    }

    /// Enable per-client rate limiting over the service's store using the
    /// configured limit and window.
    pub fn with_rate_limit(mut self) -> Self {
        self.limiter = Some(RateLimiter::new(
            Arc::clone(&self.store),
            self.config.rate_limit,
            self.config.rate_window,
        ));
        self
    }

    pub fn with_calendar(mut self, calendar: SessionCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub const fn calendar(&self) -> &SessionCalendar {
        &self.calendar
    }

    pub async fn levels(
        &self,
        client: &str,
        request: &LevelsRequest,
        now: UtcDateTime,
    ) -> Result<LevelsResponse, ServiceError> {
        if let Some(limiter) = &self.limiter {
            let decision = limiter.check(client, now).await;
            if !decision.allowed {
                warn!(client, limit = decision.limit, "rate limit exceeded");
                return Err(ServiceError::RateLimited {
                    limit: decision.limit,
                    reset_at: decision.reset_at,
                });
            }
        }

        let key = request.cache_key();
        if let Some(levels) = self.cached(&key, request.session, now).await {
            info!(key = %key, levels = levels.len(), "serving cached levels");
            return Ok(LevelsResponse {
                levels,
                failures: Vec::new(),
                cache_hit: true,
            });
        }

        let (series, failures) = self.fetch_all(request).await;
        let builder = LevelBuilder::new(self.calendar, request.session);
        let levels = builder.build_all(
            series
                .iter()
                .map(|(instrument, bars)| (instrument, bars.as_slice())),
        );

        if failures.is_empty() && !self.config.cache_ttl.is_zero() {
            let payload = serde_json::to_string(&CachedLevels {
                stored_at: now,
                levels: levels.clone(),
            })?;
            self.store
                .set(key.clone(), payload, Some(self.config.cache_ttl))
                .await;
        }

        info!(
            key = %key,
            instruments = request.instruments.len(),
            failed = failures.len(),
            levels = levels.len(),
            "built levels response"
        );
        Ok(LevelsResponse {
            levels,
            failures,
            cache_hit: false,
        })
    }

    async fn cached(
        &self,
        key: &str,
        session: Session,
        now: UtcDateTime,
    ) -> Option<Vec<TradingLevel>> {
        let raw = self.store.get(key).await?;
        let cached: CachedLevels = match serde_json::from_str(&raw) {
            Ok(cached) => cached,
            Err(error) => {
                warn!(key, error = %error, "discarding unreadable cache entry");
                self.store.delete(key).await;
                return None;
            }
        };
        if has_session_closed_since(&self.calendar, session, cached.stored_at, now) {
            debug!(key, stored_at = %cached.stored_at, "cache entry predates a session close");
            self.store.delete(key).await;
            return None;
        }
        Some(cached.levels)
    }

    /// Fetch every instrument on its own task. Results come back in request
    /// order; a failed or panicked fetch yields an empty series.
    async fn fetch_all(
        &self,
        request: &LevelsRequest,
    ) -> (Vec<(InstrumentSymbol, Vec<Bar>)>, Vec<InstrumentFailure>) {
        let handles: Vec<_> = request
            .instruments
            .iter()
            .map(|instrument| {
                let source = Arc::clone(&self.source);
                let bars_request = BarsRequest::new(instrument.clone(), request.start, request.end);
                let handle = tokio::spawn(async move {
                    match bars_request {
                        Ok(bars_request) => source.bars(bars_request).await,
                        Err(error) => Err(error),
                    }
                });
                (instrument.clone(), handle)
            })
            .collect();

        let mut series = Vec::with_capacity(handles.len());
        let mut failures = Vec::new();
        for (instrument, handle) in handles {
            let result = handle.await.unwrap_or_else(|error| {
                Err(SourceError::internal(format!("fetch task failed: {error}")))
            });
            match result {
                Ok(bars) => {
                    debug!(instrument = %instrument, bars = bars.len(), "fetched bars");
                    series.push((instrument, bars));
                }
                Err(error) => {
                    warn!(
                        instrument = %instrument,
                        code = error.code(),
                        error = %error,
                        "instrument fetch failed"
                    );
                    failures.push(InstrumentFailure::from_source(instrument.clone(), &error));
                    series.push((instrument, Vec::new()));
                }
            }
        }
        (series, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
    }

    fn symbols(values: &[&str]) -> Vec<InstrumentSymbol> {
        values
            .iter()
            .map(|value| InstrumentSymbol::parse(value).expect("symbol"))
            .collect()
    }

    #[test]
    fn request_requires_instruments() {
        let err = LevelsRequest::new(
            Vec::new(),
            date("2024-01-02"),
            date("2024-01-05"),
            Session::NewYork,
        )
        .expect_err("must fail");
        assert_eq!(err, ValidationError::NoInstruments);
    }

    #[test]
    fn request_rejects_inverted_dates() {
        let err = LevelsRequest::new(
            symbols(&["ES"]),
            date("2024-01-05"),
            date("2024-01-02"),
            Session::NewYork,
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvertedDateRange { .. }));
    }

    #[test]
    fn cache_key_is_stable() {
        let request = LevelsRequest::new(
            symbols(&["ES", "NQ"]),
            date("2024-01-02"),
            date("2024-01-05"),
            Session::NewYork,
        )
        .expect("request");
        assert_eq!(
            request.cache_key(),
            "levels:end=2024-01-05&instruments=ES,NQ&session=NewYork&start=2024-01-02"
        );
    }
}
