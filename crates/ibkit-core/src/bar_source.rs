//! Market-data collaborator contract.
//!
//! A [`BarSource`] returns the raw bars of one instrument for an inclusive
//! range of calendar dates. Sources filter rows with missing price fields
//! before bars reach the level builder.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;

use crate::{Bar, InstrumentSymbol};

/// Source-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    NotFound,
    Parse,
    Unavailable,
    InvalidRequest,
    Internal,
}

/// Structured source error, reported per instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Parse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Parse => "source.parse",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Bars for one instrument over inclusive calendar dates in the reference timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarsRequest {
    pub instrument: InstrumentSymbol,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BarsRequest {
    pub fn new(
        instrument: InstrumentSymbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, SourceError> {
        if end < start {
            return Err(SourceError::invalid_request(format!(
                "bars request end {end} is before start {start}"
            )));
        }
        Ok(Self {
            instrument,
            start,
            end,
        })
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

pub type BarsFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Bar>, SourceError>> + Send + 'a>>;

/// Market-data source contract.
///
/// Implementations must be `Send + Sync`; the level service fetches each
/// instrument on its own task.
pub trait BarSource: Send + Sync {
    /// Short identifier reported as the response's data source.
    fn name(&self) -> &'static str;

    /// Fetch bars for the requested instrument and dates, in any order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the instrument has no data
    /// ([`SourceErrorKind::NotFound`]) or the data cannot be decoded
    /// ([`SourceErrorKind::Parse`]).
    fn bars<'a>(&'a self, req: BarsRequest) -> BarsFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn rejects_inverted_range() {
        let symbol = InstrumentSymbol::parse("ES").expect("symbol");
        let error = BarsRequest::new(symbol, date("2024-01-05"), date("2024-01-02"))
            .expect_err("inverted range");
        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
        assert_eq!(error.code(), "source.invalid_request");
        assert!(!error.retryable());
    }

    #[test]
    fn range_is_inclusive() {
        let symbol = InstrumentSymbol::parse("ES").expect("symbol");
        let request =
            BarsRequest::new(symbol, date("2024-01-02"), date("2024-01-05")).expect("request");
        assert!(request.contains_date(date("2024-01-02")));
        assert!(request.contains_date(date("2024-01-05")));
        assert!(!request.contains_date(date("2024-01-06")));
    }
}
