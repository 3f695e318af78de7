//! Initial balance: high/low of the opening sub-windows of a session.

use chrono::{Duration, NaiveDate};

use crate::aggregate::aggregate_window;
use crate::calendar::SessionCalendar;
use crate::{Bar, IbRange, InitialBalance, Session, UtcDateTime};

pub const ONE_HOUR_MINUTES: i64 = 60;
pub const FIFTEEN_MINUTES: i64 = 15;

/// Compute both opening ranges anchored at the session start of `date`.
///
/// Each sub-window is scanned independently over `bars`.
pub fn compute_initial_balance(
    calendar: &SessionCalendar,
    bars: &[Bar],
    date: NaiveDate,
    session: Session,
) -> InitialBalance {
    let start = calendar.session_start(date, session);
    InitialBalance {
        one_hour: opening_range(bars, start, ONE_HOUR_MINUTES),
        fifteen_minutes: opening_range(bars, start, FIFTEEN_MINUTES),
    }
}

fn opening_range(bars: &[Bar], start: UtcDateTime, minutes: i64) -> Option<IbRange> {
    let end = start.checked_add(Duration::minutes(minutes))?;
    aggregate_window(bars, start, end).map(|ohlc| IbRange::new(ohlc.high, ohlc.low))
}
