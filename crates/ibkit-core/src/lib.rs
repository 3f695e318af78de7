//! # ibkit Core
//!
//! Session windowing and Initial Balance (IB) level engine for futures
//! instruments.
//!
//! ## Overview
//!
//! Given OHLCV bars for an instrument, the engine resolves trading-session
//! boundaries (Asia, London, New York) in US Eastern time, aggregates each
//! calendar day's session open/close/high/low, and computes the 1-hour and
//! 15-minute opening ranges.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`calendar`] | Session start/end instants with DST and day-shift rules |
//! | [`aggregate`] | Strict window and loose day-match aggregation |
//! | [`initial_balance`] | 1-hour and 15-minute opening ranges |
//! | [`levels`] | Per-day [`TradingLevel`] records |
//! | [`boundary`] | Next open/close and staleness checks |
//! | [`bar_source`] | Market-data collaborator contract |
//! | [`adapters`] | CSV directory and synthetic bar sources |
//! | [`cache`] | Injected key-value store |
//! | [`rate_limit`] | Fixed-window rate limiter |
//! | [`service`] | Cached, rate limited level building across instruments |
//! | [`export`] | CSV rendering and export filenames |
//! | [`envelope`] | Response envelope with metadata |
//! | [`config`] | Environment configuration |
//!
//! ## Quick Start
//!
//! ```rust
//! use ibkit_core::{Bar, InstrumentSymbol, LevelBuilder, Session, SessionCalendar, UtcDateTime};
//!
//! let ts = UtcDateTime::parse("2024-01-02T14:30:00Z").unwrap();
//! let bars = vec![Bar::new(ts, 100.0, 101.0, 99.0, 100.5, Some(1_000.0))];
//!
//! let builder = LevelBuilder::new(SessionCalendar::default(), Session::NewYork);
//! let levels = builder.build(&InstrumentSymbol::parse("ES").unwrap(), &bars);
//!
//! assert_eq!(levels.len(), 1);
//! assert_eq!(levels[0].initial_balance.ib_1h_range(), 2.0);
//! ```
//!
//! ## No Data
//!
//! Aggregates without bars are `None` internally. The flat wire and CSV
//! formats render them as `0`, so a consumer reading `0` must treat it as
//! absent rather than as a price.

pub mod adapters;
pub mod aggregate;
pub mod bar_source;
pub mod boundary;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod export;
pub mod initial_balance;
pub mod levels;
pub mod rate_limit;
pub mod service;

pub use adapters::{CsvDirectorySource, SampleSource};

pub use aggregate::{aggregate_session_day, aggregate_window};

pub use bar_source::{BarSource, BarsFuture, BarsRequest, SourceError, SourceErrorKind};

pub use boundary::{
    format_time_until, has_session_closed_since, is_near_session_boundary,
    minutes_until_next_boundary, next_session_boundary, DEFAULT_BOUNDARY_THRESHOLD_MINUTES,
};

pub use cache::{cache_key, KeyValueStore, MemoryStore, StoreFuture};

pub use calendar::{SessionCalendar, SessionWindow, REFERENCE_TIMEZONE};

pub use config::ServiceConfig;

pub use domain::{
    Bar, ContractSize, IbRange, InitialBalance, InstrumentInfo, InstrumentSymbol, Ohlc, Session,
    SessionDefinition, TradingLevel, UtcDateTime,
};

pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};

pub use error::{CoreError, ValidationError};

pub use export::{export_filename, levels_to_csv, CSV_HEADERS};

pub use initial_balance::{compute_initial_balance, FIFTEEN_MINUTES, ONE_HOUR_MINUTES};

pub use levels::{sort_levels, LevelBuilder, DEFAULT_AVERAGE_VOLUME};

pub use rate_limit::{RateLimitDecision, RateLimiter};

pub use service::{InstrumentFailure, LevelService, LevelsRequest, LevelsResponse, ServiceError};
