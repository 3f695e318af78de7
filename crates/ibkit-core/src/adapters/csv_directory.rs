use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::bar_source::{BarSource, BarsFuture, BarsRequest, SourceError};
use crate::calendar::SessionCalendar;
use crate::{Bar, UtcDateTime};

/// Reads bars from `<root>/<SYMBOL>.csv`.
///
/// Expected header: `ts,open,high,low,close,volume`. `ts` is RFC3339 with any
/// offset, or unix seconds/milliseconds. `volume` may be empty. Rows with an
/// empty price field are skipped.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    root: PathBuf,
    calendar: SessionCalendar,
}

#[derive(Debug, Deserialize)]
struct CsvBarRecord {
    ts: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
}

impl CsvBarRecord {
    fn into_bar(self) -> Result<Option<Bar>, String> {
        let ts = parse_ts(&self.ts)?;
        let (Some(open), Some(high), Some(low), Some(close)) =
            (self.open, self.high, self.low, self.close)
        else {
            return Ok(None);
        };
        Ok(Some(Bar::new(ts, open, high, low, close, self.volume)))
    }
}

fn parse_ts(raw: &str) -> Result<UtcDateTime, String> {
    let raw = raw.trim();
    let parsed = match raw.parse::<i64>() {
        Ok(epoch) => UtcDateTime::from_unix_auto(epoch),
        Err(_) => UtcDateTime::parse_normalized(raw),
    };
    parsed.map_err(|error| error.to_string())
}

impl CsvDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_calendar(root, SessionCalendar::default())
    }

    pub fn with_calendar(root: impl Into<PathBuf>, calendar: SessionCalendar) -> Self {
        Self {
            root: root.into(),
            calendar,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("{symbol}.csv"))
    }

    async fn load(&self, req: BarsRequest) -> Result<Vec<Bar>, SourceError> {
        let path = self.path_for(req.instrument.as_str());
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|error| match error.kind() {
                ErrorKind::NotFound => SourceError::not_found(format!(
                    "no bar file for {} at {}",
                    req.instrument,
                    path.display()
                )),
                _ => SourceError::unavailable(format!(
                    "failed to read {}: {error}",
                    path.display()
                )),
            })?;

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut bars = Vec::new();
        let mut incomplete = 0_usize;
        let mut out_of_range = 0_usize;
        let mut malformed = 0_usize;

        for (index, result) in reader.deserialize::<CsvBarRecord>().enumerate() {
            // Header is line 1.
            let line = index + 2;
            let record = result.map_err(|error| {
                SourceError::parse(format!("{}:{line}: {error}", path.display()))
            })?;
            let bar = record.into_bar().map_err(|error| {
                SourceError::parse(format!("{}:{line}: {error}", path.display()))
            })?;

            match bar {
                Some(bar) if req.contains_date(self.calendar.day_key(bar.ts)) => {
                    if let Err(error) = bar.validate() {
                        debug!(
                            instrument = %req.instrument,
                            line,
                            error = %error,
                            "malformed bar"
                        );
                        malformed += 1;
                    }
                    bars.push(bar);
                }
                Some(_) => out_of_range += 1,
                None => incomplete += 1,
            }
        }

        if incomplete > 0 {
            warn!(
                instrument = %req.instrument,
                rows = incomplete,
                "skipped rows with missing price fields"
            );
        }
        if malformed > 0 {
            warn!(
                instrument = %req.instrument,
                rows = malformed,
                "kept bars that violate OHLC bounds or contain invalid values"
            );
        }
        debug!(
            instrument = %req.instrument,
            path = %path.display(),
            bars = bars.len(),
            out_of_range,
            "loaded bars from csv"
        );
        Ok(bars)
    }
}

impl BarSource for CsvDirectorySource {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn bars<'a>(&'a self, req: BarsRequest) -> BarsFuture<'a> {
        Box::pin(self.load(req))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::bar_source::SourceErrorKind;
    use crate::InstrumentSymbol;

    fn request(symbol: &str, start: &str, end: &str) -> BarsRequest {
        let parse = |value: &str| NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date");
        BarsRequest::new(
            InstrumentSymbol::parse(symbol).expect("symbol"),
            parse(start),
            parse(end),
        )
        .expect("request")
    }

    #[tokio::test]
    async fn reads_filters_and_normalizes_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("ES.csv"),
            "ts,open,high,low,close,volume\n\
             2024-01-02T09:30:00-05:00,100,101,99,100.5,1200\n\
             1704206700,100.5,102,100,101.5,\n\
             2024-01-02T15:00:00Z,101.5,,100,101,900\n\
             2024-01-09T14:30:00Z,1,1,1,1,1\n",
        )
        .expect("write fixture");

        let source = CsvDirectorySource::new(dir.path());
        let bars = source
            .bars(request("ES", "2024-01-02", "2024-01-05"))
            .await
            .expect("bars");

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ts, UtcDateTime::parse("2024-01-02T14:30:00Z").expect("ts"));
        assert_eq!(bars[0].volume, Some(1200.0));
        assert_eq!(bars[1].ts, UtcDateTime::parse("2024-01-02T14:45:00Z").expect("ts"));
        assert_eq!(bars[1].volume, None);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = CsvDirectorySource::new(dir.path());
        let error = source
            .bars(request("NQ", "2024-01-02", "2024-01-05"))
            .await
            .expect_err("no file");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn bad_timestamp_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("GC.csv"),
            "ts,open,high,low,close,volume\nyesterday,1,2,0.5,1.5,10\n",
        )
        .expect("write fixture");

        let source = CsvDirectorySource::new(dir.path());
        let error = source
            .bars(request("GC", "2024-01-02", "2024-01-05"))
            .await
            .expect_err("bad ts");
        assert_eq!(error.kind(), SourceErrorKind::Parse);
        assert!(error.message().contains(":2:"));
    }

    #[tokio::test]
    async fn malformed_bars_are_kept_for_the_caller() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("CL.csv"),
            "ts,open,high,low,close,volume\n\
             2024-01-02T14:30:00Z,72,71,73,72.5,500\n\
             2024-01-02T14:45:00Z,72.5,73,72,72.8,-5\n\
             2024-01-02T15:00:00Z,72.8,73.2,72.6,73,400\n",
        )
        .expect("write fixture");

        let source = CsvDirectorySource::new(dir.path());
        let bars = source
            .bars(request("CL", "2024-01-02", "2024-01-02"))
            .await
            .expect("bars");

        assert_eq!(bars.len(), 3);
        let flagged = bars.iter().filter(|bar| bar.validate().is_err()).count();
        assert_eq!(flagged, 2);
        assert_eq!(bars[0].high, 71.0);
    }
}
