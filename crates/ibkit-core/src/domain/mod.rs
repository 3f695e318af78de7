//! # Domain Models
//!
//! Value types shared by the session engine.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bar`] | OHLCV sample with a UTC timestamp |
//! | [`Session`] | Asia, London or New York |
//! | [`SessionDefinition`] | Wall-clock start/end of a session in US Eastern time |
//! | [`Ohlc`] | Window aggregate (open, close, high, low) |
//! | [`InitialBalance`] | 1-hour and 15-minute opening ranges |
//! | [`TradingLevel`] | One output record per instrument, day and session |
//! | [`InstrumentSymbol`] | Validated ticker |
//! | [`UtcDateTime`] | UTC instant |
//!
//! Bars are not validated at construction. Malformed input flows through the
//! aggregates unchanged; [`Bar::validate`] reports it.

pub mod instruments;
mod models;
mod session;
mod symbol;
mod timestamp;

pub use instruments::{ContractSize, InstrumentInfo};
pub use models::{Bar, IbRange, InitialBalance, Ohlc, TradingLevel};
pub use session::{Session, SessionDefinition};
pub use symbol::InstrumentSymbol;
pub use timestamp::UtcDateTime;
