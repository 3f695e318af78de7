use std::fmt::{Display, Formatter};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ValidationError;

/// Epoch values below this are read as seconds, at or above as milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Absolute instant normalized to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(DateTime<Utc>);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse RFC3339, accepting only a UTC offset.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = DateTime::parse_from_rfc3339(input.trim()).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        if parsed.offset().local_minus_utc() != 0 {
            return Err(ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            });
        }

        Ok(Self(parsed.with_timezone(&Utc)))
    }

    /// Parse RFC3339 with any offset and normalize it to UTC.
    pub fn parse_normalized(input: &str) -> Result<Self, ValidationError> {
        DateTime::parse_from_rfc3339(input.trim())
            .map(|parsed| Self(parsed.with_timezone(&Utc)))
            .map_err(|_| ValidationError::InvalidTimestamp {
                value: input.to_owned(),
            })
    }

    pub fn from_unix_millis(millis: i64) -> Result<Self, ValidationError> {
        DateTime::from_timestamp_millis(millis)
            .map(Self)
            .ok_or(ValidationError::TimestampOutOfRange { value: millis })
    }

    pub fn from_unix_seconds(seconds: i64) -> Result<Self, ValidationError> {
        DateTime::from_timestamp(seconds, 0)
            .map(Self)
            .ok_or(ValidationError::TimestampOutOfRange { value: seconds })
    }

    /// Interpret an epoch value of either second or millisecond precision.
    pub fn from_unix_auto(value: i64) -> Result<Self, ValidationError> {
        if value.abs() < MILLIS_THRESHOLD {
            Self::from_unix_seconds(value)
        } else {
            Self::from_unix_millis(value)
        }
    }

    pub const fn from_datetime(value: DateTime<Utc>) -> Self {
        Self(value)
    }

    pub const fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    pub fn unix_millis(self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        self.0.checked_add_signed(duration).map(Self)
    }

    pub fn format_rfc3339(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl From<DateTime<Utc>> for UtcDateTime {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcDateTime::parse("2024-01-02T14:30:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-02T14:30:00Z");
    }

    #[test]
    fn rejects_non_utc_timestamp() {
        let err = UtcDateTime::parse("2024-01-02T09:30:00-05:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn normalizes_offset_timestamps() {
        let parsed = UtcDateTime::parse_normalized("2024-01-02T09:30:00-05:00").expect("parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-02T14:30:00Z");
    }

    #[test]
    fn epoch_precision_is_detected() {
        let seconds = UtcDateTime::from_unix_auto(1_704_205_800).expect("seconds");
        let millis = UtcDateTime::from_unix_auto(1_704_205_800_000).expect("millis");
        assert_eq!(seconds, millis);
        assert_eq!(millis.format_rfc3339(), "2024-01-02T14:30:00Z");
    }
}
