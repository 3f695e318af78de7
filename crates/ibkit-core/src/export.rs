//! CSV export of trading levels.

use chrono::{NaiveDate, NaiveDateTime};

use crate::{CoreError, InstrumentSymbol, Session, TradingLevel};

pub const CSV_HEADERS: [&str; 14] = [
    "Date",
    "Session",
    "Instrument",
    "Open",
    "Close",
    "High",
    "Low",
    "Volume",
    "IB 1H High",
    "IB 1H Low",
    "IB 1H Range",
    "IB 15M High",
    "IB 15M Low",
    "IB 15M Range",
];

/// Render levels as CSV, prices to two decimals and volume to none.
///
/// Returns an empty string when there is nothing to export.
pub fn levels_to_csv(levels: &[TradingLevel]) -> Result<String, CoreError> {
    if levels.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;

    for level in levels {
        let ib = &level.initial_balance;
        writer.write_record([
            level.date.to_string(),
            level.session.to_string(),
            level.instrument.to_string(),
            price(level.open),
            price(level.close),
            price(level.high),
            price(level.low),
            format!("{:.0}", level.volume),
            price(ib.ib_1h_high()),
            price(ib.ib_1h_low()),
            price(ib.ib_1h_range()),
            price(ib.ib_15m_high()),
            price(ib.ib_15m_low()),
            price(ib.ib_15m_range()),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| CoreError::Csv(error.into_error().into()))?;
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

fn price(value: f64) -> String {
    format!("{value:.2}")
}

/// `IBLevels_<I1-I2>_<Session>_<MMdd>-<MMdd>_<HHmmss>.csv`
pub fn export_filename(
    instruments: &[InstrumentSymbol],
    session: Session,
    start: NaiveDate,
    end: NaiveDate,
    now: NaiveDateTime,
) -> String {
    let instruments = instruments
        .iter()
        .map(InstrumentSymbol::as_str)
        .collect::<Vec<_>>()
        .join("-");
    format!(
        "IBLevels_{instruments}_{session}_{}-{}_{}.csv",
        start.format("%m%d"),
        end.format("%m%d"),
        now.format("%H%M%S"),
    )
}
