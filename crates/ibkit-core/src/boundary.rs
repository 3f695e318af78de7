//! Session open/close boundaries relative to an explicit clock.
//!
//! Used to decide when cached levels go stale and to drive countdowns.

use chrono::{NaiveDate, NaiveTime};

use crate::calendar::SessionCalendar;
use crate::{Session, UtcDateTime};

pub const DEFAULT_BOUNDARY_THRESHOLD_MINUTES: i64 = 5;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Earliest session open or close strictly after `now`.
pub fn next_session_boundary(
    calendar: &SessionCalendar,
    session: Session,
    now: UtcDateTime,
) -> UtcDateTime {
    let definition = session.definition();
    let today = calendar.day_key(now);
    let tomorrow = today.succ_opt().unwrap_or(today);

    let at = |date: NaiveDate, time: NaiveTime| calendar.resolve_local(date.and_time(time));
    let today_boundaries = [
        at(today, definition.start_time()),
        at(today, definition.end_time()),
    ];
    let tomorrow_boundaries = [
        at(tomorrow, definition.start_time()),
        at(tomorrow, definition.end_time()),
    ];

    today_boundaries
        .into_iter()
        .filter(|boundary| *boundary > now)
        .chain(tomorrow_boundaries)
        .min()
        .unwrap_or(now)
}

/// Whole minutes until the next boundary, rounded down.
pub fn minutes_until_next_boundary(
    calendar: &SessionCalendar,
    session: Session,
    now: UtcDateTime,
) -> i64 {
    let next = next_session_boundary(calendar, session, now);
    (next.unix_millis() - now.unix_millis()).div_euclid(MILLIS_PER_MINUTE)
}

pub fn is_near_session_boundary(
    calendar: &SessionCalendar,
    session: Session,
    now: UtcDateTime,
    threshold_minutes: i64,
) -> bool {
    let next = next_session_boundary(calendar, session, now);
    next.unix_millis() - now.unix_millis() <= threshold_minutes * MILLIS_PER_MINUTE
}

/// Whether today's or yesterday's session close lies in `(since, now]`.
pub fn has_session_closed_since(
    calendar: &SessionCalendar,
    session: Session,
    since: UtcDateTime,
    now: UtcDateTime,
) -> bool {
    let close_time = session.definition().end_time();
    let today = calendar.day_key(now);
    let yesterday = today.pred_opt().unwrap_or(today);

    [today, yesterday].into_iter().any(|date| {
        let close = calendar.resolve_local(date.and_time(close_time));
        since < close && now >= close
    })
}

/// Human countdown: `45m`, `2h`, `2h 5m`.
pub fn format_time_until(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {remaining}m")
    }
}
