//! Level builder: per-day session aggregates for one or more instruments.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::aggregate::aggregate_session_day;
use crate::calendar::SessionCalendar;
use crate::initial_balance::compute_initial_balance;
use crate::{Bar, InstrumentSymbol, Session, TradingLevel};

/// Average volume reported when a day group has no bars to divide by.
pub const DEFAULT_AVERAGE_VOLUME: f64 = 100_000.0;

/// Builds [`TradingLevel`] records for a fixed session.
#[derive(Debug, Clone, Copy)]
pub struct LevelBuilder {
    calendar: SessionCalendar,
    session: Session,
}

impl LevelBuilder {
    pub const fn new(calendar: SessionCalendar, session: Session) -> Self {
        Self { calendar, session }
    }

    pub const fn session(&self) -> Session {
        self.session
    }

    pub const fn calendar(&self) -> &SessionCalendar {
        &self.calendar
    }

    /// Levels for one instrument, newest day first.
    ///
    /// Bars are grouped by their calendar day in the reference timezone; a day
    /// whose session aggregate has no bars is dropped.
    pub fn build(&self, instrument: &InstrumentSymbol, bars: &[Bar]) -> Vec<TradingLevel> {
        let groups = group_by_day(&self.calendar, bars);
        let day_count = groups.len();

        let mut levels: Vec<TradingLevel> = groups
            .into_iter()
            .filter_map(|(date, group)| self.build_day(instrument, date, &group))
            .collect();
        sort_levels(&mut levels);

        info!(
            instrument = %instrument,
            session = %self.session,
            bars = bars.len(),
            days = day_count,
            levels = levels.len(),
            "built trading levels"
        );
        levels
    }

    /// Levels for several instruments, concatenated in input order and then
    /// sorted newest day first.
    pub fn build_all<'a, I>(&self, series: I) -> Vec<TradingLevel>
    where
        I: IntoIterator<Item = (&'a InstrumentSymbol, &'a [Bar])>,
    {
        let mut levels: Vec<TradingLevel> = series
            .into_iter()
            .flat_map(|(instrument, bars)| self.build(instrument, bars))
            .collect();
        sort_levels(&mut levels);
        levels
    }

    fn build_day(
        &self,
        instrument: &InstrumentSymbol,
        date: NaiveDate,
        group: &[Bar],
    ) -> Option<TradingLevel> {
        let session_start = self.calendar.session_start(date, self.session);
        let Some(ohlc) = aggregate_session_day(group, session_start) else {
            debug!(
                instrument = %instrument,
                date = %date,
                bars = group.len(),
                "no session data for day, skipping"
            );
            return None;
        };

        let initial_balance = compute_initial_balance(&self.calendar, group, date, self.session);
        debug!(
            instrument = %instrument,
            date = %date,
            bars = group.len(),
            ib_1h_range = initial_balance.ib_1h_range(),
            ib_15m_range = initial_balance.ib_15m_range(),
            "aggregated session day"
        );

        Some(TradingLevel {
            date,
            session: self.session,
            instrument: instrument.clone(),
            open: ohlc.open,
            close: ohlc.close,
            high: ohlc.high,
            low: ohlc.low,
            volume: average_volume(group),
            initial_balance,
        })
    }
}

/// Stable sort by date, newest first.
pub fn sort_levels(levels: &mut [TradingLevel]) {
    levels.sort_by(|a, b| b.date.cmp(&a.date));
}

fn group_by_day(calendar: &SessionCalendar, bars: &[Bar]) -> BTreeMap<NaiveDate, Vec<Bar>> {
    let mut groups: BTreeMap<NaiveDate, Vec<Bar>> = BTreeMap::new();
    for bar in bars {
        groups
            .entry(calendar.day_key(bar.ts))
            .or_default()
            .push(bar.clone());
    }
    groups
}

fn average_volume(group: &[Bar]) -> f64 {
    if group.is_empty() {
        return DEFAULT_AVERAGE_VOLUME;
    }
    let total: f64 = group.iter().map(Bar::volume_or_zero).sum();
    total / group.len() as f64
}
