//! gh-calendar
//!
//! NYSE trading-day calendar. Given an instant, finds the most recent day the
//! exchange was open, which is the day whose Dow Jones value seeds a geohash.
//!
//! Pure logic apart from the per-year holiday memo. No IO, no wall-clock.

mod holidays;
mod session;

pub use holidays::{Holiday, HolidayMemo};
pub use session::{
    is_before_market_open, nyse_tz, shift_days, CalendarError, Closure, MarketCalendar,
    MAX_CORRECTION_STEPS,
};
