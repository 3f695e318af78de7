//! Session calendar: resolves a calendar date and a [`Session`] into absolute
//! instants in an explicit reference timezone.
//!
//! Sessions are defined as wall-clock times in US Eastern time, so the UTC
//! instants move by an hour across DST transitions. Machine-local time is
//! never consulted.
//!
//! Two day-shift rules apply:
//!
//! - A session that opens in the evening and wraps midnight (Asia,
//!   18:00 → 03:00) is attributed to the following day. A query whose hour
//!   of day is before noon therefore resolves its start to the evening of the
//!   previous calendar day.
//! - The end of a wrapping session falls on the calendar day after its start.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use serde::Serialize;

use crate::{Session, UtcDateTime};

/// Default reference timezone for session boundaries.
pub const REFERENCE_TIMEZONE: Tz = chrono_tz::America::New_York;

const NOON_HOUR: u32 = 12;

/// Resolved `[start, end)` instants of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionWindow {
    pub session: Session,
    pub start: UtcDateTime,
    pub end: UtcDateTime,
}

impl SessionWindow {
    pub fn contains(&self, ts: UtcDateTime) -> bool {
        ts >= self.start && ts < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end.into_inner() - self.start.into_inner()
    }
}

/// Maps dates and instants onto session boundaries in a fixed timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCalendar {
    timezone: Tz,
}

impl Default for SessionCalendar {
    fn default() -> Self {
        Self::new(REFERENCE_TIMEZONE)
    }
}

impl SessionCalendar {
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn local(&self, ts: UtcDateTime) -> DateTime<Tz> {
        ts.into_inner().with_timezone(&self.timezone)
    }

    /// Calendar date of an instant in the reference timezone.
    pub fn day_key(&self, ts: UtcDateTime) -> NaiveDate {
        self.local(ts).date_naive()
    }

    /// Session start for a calendar date (read as local midnight).
    pub fn session_start(&self, date: NaiveDate, session: Session) -> UtcDateTime {
        self.session_start_at(date.and_time(NaiveTime::MIN), session)
    }

    /// Session end for a calendar date (read as local midnight).
    pub fn session_end(&self, date: NaiveDate, session: Session) -> UtcDateTime {
        self.session_end_at(date.and_time(NaiveTime::MIN), session)
    }

    pub fn session_window(&self, date: NaiveDate, session: Session) -> SessionWindow {
        self.session_window_at(date.and_time(NaiveTime::MIN), session)
    }

    /// Session start for a local query time; the query's hour drives the
    /// previous-evening shift.
    pub fn session_start_at(&self, query: NaiveDateTime, session: Session) -> UtcDateTime {
        let definition = session.definition();
        let date = start_date(query, session);
        self.resolve_local(date.and_time(definition.start_time()))
    }

    pub fn session_end_at(&self, query: NaiveDateTime, session: Session) -> UtcDateTime {
        let definition = session.definition();
        let mut date = start_date(query, session);
        if definition.wraps_midnight() {
            date = date.succ_opt().unwrap_or(date);
        }
        self.resolve_local(date.and_time(definition.end_time()))
    }

    pub fn session_window_at(&self, query: NaiveDateTime, session: Session) -> SessionWindow {
        SessionWindow {
            session,
            start: self.session_start_at(query, session),
            end: self.session_end_at(query, session),
        }
    }

    /// Whether the instant's local time-of-day lies inside the session window.
    pub fn is_in_session(&self, ts: UtcDateTime, session: Session) -> bool {
        let local = self.local(ts);
        let minute_of_day = local.hour() * 60 + local.minute();
        session.definition().contains_minute_of_day(minute_of_day)
    }

    /// Resolve a wall-clock time in the reference timezone to an instant.
    ///
    /// Ambiguous times (DST fall-back) take the earlier instant; times inside
    /// a spring-forward gap move past the gap.
    pub fn resolve_local(&self, naive: NaiveDateTime) -> UtcDateTime {
        match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(local) => UtcDateTime::from_datetime(local.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => {
                UtcDateTime::from_datetime(earliest.with_timezone(&Utc))
            }
            LocalResult::None => self.resolve_local(naive + Duration::minutes(30)),
        }
    }
}

fn start_date(query: NaiveDateTime, session: Session) -> NaiveDate {
    let date = query.date();
    if session.definition().starts_previous_evening() && query.hour() < NOON_HOUR {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}
