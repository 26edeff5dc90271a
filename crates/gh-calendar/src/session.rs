//! Trading-day correction: the NYSE open/closed decision for an instant.
//!
//! # Order of checks
//!
//! 1. Hour check: if the NYSE has not opened yet (before 09:30 New York time)
//!    the instant moves back 12 hours, exactly once. A full day would land on
//!    the next "too early" instant and overshoot by a day.
//! 2. Day loop: while the civil date is a weekend or a holiday, move back one
//!    calendar day. At most [`MAX_CORRECTION_STEPS`] steps.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeDelta, Timelike, Weekday};
use chrono_tz::{America::New_York, Tz};
use thiserror::Error;
use tracing::trace;

use crate::holidays::{Holiday, HolidayMemo};

/// Upper bound for the day loop. The NYSE is never closed a full week.
pub const MAX_CORRECTION_STEPS: u32 = 7;

/// NYSE opening time, New York wall clock (hour, minute).
const MARKET_OPEN: (u32, u32) = (9, 30);

/// America/New_York, ET (UTC-05:00) with daylight saving time (UTC-04:00).
pub fn nyse_tz() -> Tz {
    New_York
}

/// Returns `true` if the NYSE has not opened yet on the New York day that
/// `instant` falls on.
pub fn is_before_market_open(instant: &DateTime<Tz>) -> bool {
    let ny = instant.with_timezone(&New_York);
    (ny.hour(), ny.minute()) < MARKET_OPEN
}

/// Moves `instant` by whole calendar days, keeping its wall-clock time.
///
/// Falls back to 24-hour steps when the target wall-clock time does not exist
/// or is ambiguous in the instant's zone.
pub fn shift_days(instant: DateTime<Tz>, days: i64) -> DateTime<Tz> {
    let shifted = if days >= 0 {
        instant.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        instant.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or_else(|| instant + TimeDelta::days(days))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    /// The day loop ran out of steps. Indicates a broken holiday rule.
    #[error("cannot correct {start}: NYSE shouldn't be closed {steps} days in a row")]
    CorrectionExhausted { start: NaiveDate, steps: u32 },
}

// ---------------------------------------------------------------------------
// Closure
// ---------------------------------------------------------------------------

/// Why the NYSE is closed on a given day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Closure {
    Weekend(Weekday),
    Holiday(Holiday),
}

// ---------------------------------------------------------------------------
// MarketCalendar
// ---------------------------------------------------------------------------

/// NYSE calendar backed by a shared [`HolidayMemo`].
///
/// Construct once and share it (`Arc<MarketCalendar>`); the memo lives as long
/// as the calendar.
#[derive(Debug, Default)]
pub struct MarketCalendar {
    holidays: HolidayMemo,
}

impl MarketCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holidays(&self) -> &HolidayMemo {
        &self.holidays
    }

    /// Returns why the NYSE is closed on `date`, or `None` on a trading day.
    pub fn closure_on(&self, date: NaiveDate) -> Option<Closure> {
        let weekday = date.weekday();
        if matches!(weekday, Weekday::Sat | Weekday::Sun) {
            return Some(Closure::Weekend(weekday));
        }
        self.holidays.holiday_on(date).map(Closure::Holiday)
    }

    pub fn is_closed_on(&self, date: NaiveDate) -> bool {
        self.closure_on(date).is_some()
    }

    /// Most recent instant, at or before `instant`, on which the NYSE was
    /// open. The time zone of `instant` is kept.
    pub fn correct(&self, instant: DateTime<Tz>) -> Result<DateTime<Tz>, CalendarError> {
        self.correct_within(instant, MAX_CORRECTION_STEPS)
    }

    fn correct_within(
        &self,
        instant: DateTime<Tz>,
        max_steps: u32,
    ) -> Result<DateTime<Tz>, CalendarError> {
        let mut day = instant;

        if is_before_market_open(&day) {
            day -= TimeDelta::hours(12);
        }

        for _ in 0..max_steps {
            match self.closure_on(day.date_naive()) {
                None => return Ok(day),
                Some(closure) => {
                    trace!(date = %day.date_naive(), ?closure, "NYSE closed, stepping back");
                    day = shift_days(day, -1);
                }
            }
        }

        Err(CalendarError::CorrectionExhausted {
            start: instant.date_naive(),
            steps: max_steps,
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
