//! Window aggregation over bar slices.
//!
//! Two matchers exist and must stay separate:
//!
//! | Function | Match rule | Used for |
//! |----------|------------|----------|
//! | [`aggregate_window`] | `start <= ts < end` | initial-balance sub-windows |
//! | [`aggregate_session_day`] | whole days between `ts` and session start is `0` | session open/close/high/low |

use crate::{Bar, Ohlc, UtcDateTime};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Aggregate bars in the half-open interval `[start, end)`.
///
/// Returns `None` when no bar falls in the window.
pub fn aggregate_window(bars: &[Bar], start: UtcDateTime, end: UtcDateTime) -> Option<Ohlc> {
    aggregate_matching(bars, |bar| bar.ts >= start && bar.ts < end)
}

/// Aggregate bars whose floored day offset from `session_start` is zero.
///
/// Equivalent to the 24-hour span starting at the session open, independent of
/// where the session itself ends.
pub fn aggregate_session_day(bars: &[Bar], session_start: UtcDateTime) -> Option<Ohlc> {
    let start_ms = session_start.unix_millis();
    aggregate_matching(bars, |bar| {
        (bar.ts.unix_millis() - start_ms).div_euclid(MILLIS_PER_DAY) == 0
    })
}

fn aggregate_matching<F>(bars: &[Bar], matches: F) -> Option<Ohlc>
where
    F: Fn(&Bar) -> bool,
{
    let mut selected: Vec<&Bar> = bars.iter().filter(|bar| matches(bar)).collect();
    // Stable, so equal timestamps keep input order for open/close.
    selected.sort_by_key(|bar| bar.ts);

    let first = selected.first()?;
    let last = selected.last()?;

    let high = selected
        .iter()
        .map(|bar| bar.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let low = selected
        .iter()
        .map(|bar| bar.low)
        .fold(f64::INFINITY, f64::min);

    Some(Ohlc {
        open: first.open,
        close: last.close,
        high,
        low,
    })
}
