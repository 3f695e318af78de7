use chrono::{Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

use crate::bar_source::{BarSource, BarsFuture, BarsRequest, SourceError};
use crate::calendar::SessionCalendar;
use crate::domain::instruments;
use crate::{Bar, InstrumentSymbol, UtcDateTime};

const BAR_MINUTES: u32 = 15;
const FALLBACK_REFERENCE_PRICE: f64 = 1000.0;
/// Per-bar volatility as a fraction of price.
const VOLATILITY: f64 = 0.002;
const DAY_SEED_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic synthetic 15-minute bars, around the clock on weekdays.
///
/// The same instrument and day always produce the same bars, whatever the
/// requested range.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleSource {
    calendar: SessionCalendar,
}

impl SampleSource {
    pub const fn new(calendar: SessionCalendar) -> Self {
        Self { calendar }
    }

    pub fn generate(&self, req: &BarsRequest) -> Vec<Bar> {
        let reference = instruments::lookup(&req.instrument)
            .map_or(FALLBACK_REFERENCE_PRICE, |info| info.reference_price);

        let mut bars = Vec::new();
        let mut date = req.start;
        while date <= req.end {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                self.generate_day(&req.instrument, date, reference, &mut bars);
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        bars
    }

    fn generate_day(
        &self,
        instrument: &InstrumentSymbol,
        date: NaiveDate,
        reference: f64,
        bars: &mut Vec<Bar>,
    ) {
        let mut rng = fastrand::Rng::with_seed(day_seed(instrument, date));
        let mut price = reference * (1.0 + (rng.f64() - 0.5) * VOLATILITY * 10.0);

        for minute_of_day in (0..24 * 60).step_by(BAR_MINUTES as usize) {
            let Some(time) = NaiveTime::from_hms_opt(minute_of_day / 60, minute_of_day % 60, 0)
            else {
                continue;
            };
            // Wall-clock times inside a DST gap do not exist and get no bar.
            let Some(local) = self
                .calendar
                .timezone()
                .from_local_datetime(&date.and_time(time))
                .earliest()
            else {
                continue;
            };

            let volatility = price * VOLATILITY;
            let open = price;
            let close = open + (rng.f64() - 0.5) * volatility;
            let high = open.max(close) + rng.f64() * volatility * 0.5;
            let low = open.min(close) - rng.f64() * volatility * 0.5;
            let volume = f64::from(rng.u32(1_000..11_000));

            bars.push(Bar::new(
                UtcDateTime::from_datetime(local.with_timezone(&Utc)),
                round_cents(open),
                round_cents(high),
                round_cents(low),
                round_cents(close),
                Some(volume),
            ));
            price = close;
        }
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn symbol_seed(symbol: &InstrumentSymbol) -> u64 {
    symbol
        .as_str()
        .bytes()
        .fold(0xCBF2_9CE4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01B3)
        })
}

fn day_seed(symbol: &InstrumentSymbol, date: NaiveDate) -> u64 {
    let day = u64::from(date.num_days_from_ce().unsigned_abs());
    symbol_seed(symbol) ^ day.wrapping_mul(DAY_SEED_MULTIPLIER)
}

impl BarSource for SampleSource {
    fn name(&self) -> &'static str {
        "sample"
    }

    fn bars<'a>(&'a self, req: BarsRequest) -> BarsFuture<'a> {
        Box::pin(async move { Ok::<_, SourceError>(self.generate(&req)) })
    }
}
