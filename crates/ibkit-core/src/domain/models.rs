use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{InstrumentSymbol, Session, UtcDateTime, ValidationError};

/// OHLCV sample at a point in time.
///
/// Construction never rejects malformed prices; use [`Bar::validate`] to
/// surface them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Bar {
    pub fn new(
        ts: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<f64>,
    ) -> Self {
        Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn volume_or_zero(&self) -> f64 {
        self.volume.unwrap_or(0.0)
    }

    /// Check `low <= min(open, close) <= max(open, close) <= high` and field sanity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_finite("open", self.open)?;
        validate_finite("high", self.high)?;
        validate_finite("low", self.low)?;
        validate_finite("close", self.close)?;

        if let Some(volume) = self.volume {
            validate_finite("volume", volume)?;
            if volume < 0.0 {
                return Err(ValidationError::NegativeValue { field: "volume" });
            }
        }

        if self.high < self.low {
            return Err(ValidationError::InvalidBarRange);
        }

        let open_in_range = (self.low..=self.high).contains(&self.open);
        let close_in_range = (self.low..=self.high).contains(&self.close);
        if !open_in_range || !close_in_range {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(())
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFiniteValue { field })
    }
}

/// Open/close/high/low over a window of bars.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
}

impl Ohlc {
    /// All-zero "no data" value.
    pub const NO_DATA: Self = Self {
        open: 0.0,
        close: 0.0,
        high: 0.0,
        low: 0.0,
    };

    pub fn or_sentinel(aggregate: Option<Self>) -> Self {
        aggregate.unwrap_or(Self::NO_DATA)
    }
}

/// High/low extent of an initial-balance window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IbRange {
    pub high: f64,
    pub low: f64,
    pub range: f64,
}

impl IbRange {
    pub fn new(high: f64, low: f64) -> Self {
        Self {
            high,
            low,
            range: high - low,
        }
    }
}

/// Opening-window extents for one session day.
///
/// A window without bars is `None`. On the wire it is flattened to six
/// numeric fields where an absent window reads as `0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "InitialBalanceFields", into = "InitialBalanceFields")]
pub struct InitialBalance {
    pub one_hour: Option<IbRange>,
    pub fifteen_minutes: Option<IbRange>,
}

impl InitialBalance {
    pub fn ib_1h_high(&self) -> f64 {
        self.one_hour.map_or(0.0, |ib| ib.high)
    }

    pub fn ib_1h_low(&self) -> f64 {
        self.one_hour.map_or(0.0, |ib| ib.low)
    }

    pub fn ib_1h_range(&self) -> f64 {
        self.one_hour.map_or(0.0, |ib| ib.range)
    }

    pub fn ib_15m_high(&self) -> f64 {
        self.fifteen_minutes.map_or(0.0, |ib| ib.high)
    }

    pub fn ib_15m_low(&self) -> f64 {
        self.fifteen_minutes.map_or(0.0, |ib| ib.low)
    }

    pub fn ib_15m_range(&self) -> f64 {
        self.fifteen_minutes.map_or(0.0, |ib| ib.range)
    }

    pub fn is_empty(&self) -> bool {
        self.one_hour.is_none() && self.fifteen_minutes.is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct InitialBalanceFields {
    ib_1h_high: f64,
    ib_1h_low: f64,
    ib_1h_range: f64,
    ib_15m_high: f64,
    ib_15m_low: f64,
    ib_15m_range: f64,
}

impl From<InitialBalance> for InitialBalanceFields {
    fn from(value: InitialBalance) -> Self {
        Self {
            ib_1h_high: value.ib_1h_high(),
            ib_1h_low: value.ib_1h_low(),
            ib_1h_range: value.ib_1h_range(),
            ib_15m_high: value.ib_15m_high(),
            ib_15m_low: value.ib_15m_low(),
            ib_15m_range: value.ib_15m_range(),
        }
    }
}

impl From<InitialBalanceFields> for InitialBalance {
    fn from(value: InitialBalanceFields) -> Self {
        Self {
            one_hour: present_range(value.ib_1h_high, value.ib_1h_low),
            fifteen_minutes: present_range(value.ib_15m_high, value.ib_15m_low),
        }
    }
}

fn present_range(high: f64, low: f64) -> Option<IbRange> {
    if high == 0.0 && low == 0.0 {
        None
    } else {
        Some(IbRange::new(high, low))
    }
}

/// Aggregate levels for one (instrument, calendar day, session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingLevel {
    pub date: NaiveDate,
    pub session: Session,
    pub instrument: InstrumentSymbol,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    /// Average per-bar volume over the day group.
    pub volume: f64,
    pub initial_balance: InitialBalance,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> UtcDateTime {
        UtcDateTime::parse("2024-01-02T14:30:00Z").expect("timestamp")
    }

    #[test]
    fn malformed_bars_are_constructed_but_flagged() {
        let bar = Bar::new(ts(), 10.0, 12.0, 9.0, 12.5, Some(10.0));
        assert_eq!(bar.close, 12.5);
        assert!(matches!(bar.validate(), Err(ValidationError::InvalidBarBounds)));

        let inverted = Bar::new(ts(), 10.0, 9.0, 11.0, 10.0, None);
        assert!(matches!(inverted.validate(), Err(ValidationError::InvalidBarRange)));
    }

    #[test]
    fn missing_volume_reads_as_zero() {
        let bar = Bar::new(ts(), 100.0, 101.0, 99.0, 100.5, None);
        assert_eq!(bar.volume_or_zero(), 0.0);
        assert!(bar.validate().is_ok());
    }

    #[test]
    fn range_is_high_minus_low() {
        let ib = IbRange::new(101.25, 99.5);
        assert_eq!(ib.range, 101.25 - 99.5);
    }

    #[test]
    fn absent_windows_serialize_as_zero() {
        let ib = InitialBalance {
            one_hour: Some(IbRange::new(101.0, 99.0)),
            fifteen_minutes: None,
        };
        let value = serde_json::to_value(ib).expect("serialize");
        assert_eq!(value["ib_1h_range"], serde_json::json!(2.0));
        assert_eq!(value["ib_15m_high"], serde_json::json!(0.0));
        assert_eq!(value["ib_15m_range"], serde_json::json!(0.0));

        let decoded: InitialBalance = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded, ib);
    }
}
