//! NYSE holiday rules and the per-year memo.
//!
//! Every rule is a pure function of the year. The memo computes all rules of a
//! year at once on first use and never invalidates an entry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use parking_lot::RwLock;

// ---------------------------------------------------------------------------
// Holiday
// ---------------------------------------------------------------------------

/// A day the NYSE closes for, based on
/// <https://geohashing.site/geohashing/Dow_holiday#Official_Holidays>.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Holiday {
    NewYearsDay,
    Juneteenth,
    IndependenceDay,
    Christmas,
    MartinLutherKingJr,
    WashingtonsBirthday,
    LaborDay,
    Thanksgiving,
    MemorialDay,
    GoodFriday,
}

impl Holiday {
    pub const ALL: [Holiday; 10] = [
        Holiday::NewYearsDay,
        Holiday::Juneteenth,
        Holiday::IndependenceDay,
        Holiday::Christmas,
        Holiday::MartinLutherKingJr,
        Holiday::WashingtonsBirthday,
        Holiday::LaborDay,
        Holiday::Thanksgiving,
        Holiday::MemorialDay,
        Holiday::GoodFriday,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Holiday::NewYearsDay => "New Year's Day",
            Holiday::Juneteenth => "Juneteenth National Independence Day",
            Holiday::IndependenceDay => "Independence Day",
            Holiday::Christmas => "Christmas Day",
            Holiday::MartinLutherKingJr => "Martin Luther King, Jr. Day",
            Holiday::WashingtonsBirthday => "Washington's Birthday",
            Holiday::LaborDay => "Labor Day",
            Holiday::Thanksgiving => "Thanksgiving Day",
            Holiday::MemorialDay => "Memorial Day",
            Holiday::GoodFriday => "Good Friday",
        }
    }

    /// The date this holiday is observed on in `year`.
    ///
    /// `None` only for years outside chrono's representable range.
    pub fn observed_in(&self, year: i32) -> Option<NaiveDate> {
        match self {
            Holiday::NewYearsDay => fixed_date(year, 1, 1),
            Holiday::Juneteenth => fixed_date(year, 6, 19),
            Holiday::IndependenceDay => fixed_date(year, 7, 4),
            Holiday::Christmas => fixed_date(year, 12, 25),
            Holiday::MartinLutherKingJr => {
                NaiveDate::from_weekday_of_month_opt(year, 1, Weekday::Mon, 3)
            }
            Holiday::WashingtonsBirthday => {
                NaiveDate::from_weekday_of_month_opt(year, 2, Weekday::Mon, 3)
            }
            Holiday::LaborDay => NaiveDate::from_weekday_of_month_opt(year, 9, Weekday::Mon, 1),
            Holiday::Thanksgiving => {
                NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4)
            }
            Holiday::MemorialDay => last_weekday_of_may(year, Weekday::Mon),
            Holiday::GoodFriday => good_friday(year),
        }
    }
}

impl std::fmt::Display for Holiday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Fixed-date federal holiday, moved to Friday when it falls on a Saturday
/// and to Monday when it falls on a Sunday (5 U.S.C. 6103).
///
/// A Saturday New Year's Day is observed on December 31 of the previous year,
/// so it never matches a date of `year` itself.
fn fixed_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    match date.weekday() {
        Weekday::Sat => date.pred_opt(),
        Weekday::Sun => date.succ_opt(),
        _ => Some(date),
    }
}

fn last_weekday_of_may(year: i32, weekday: Weekday) -> Option<NaiveDate> {
    let mut date = NaiveDate::from_ymd_opt(year, 5, 31)?;
    while date.weekday() != weekday {
        date = date.pred_opt()?;
    }
    Some(date)
}

/// Good Friday, two days before Easter Sunday as given by Gauss's Easter
/// algorithm including its two April exceptions.
///
/// <https://en.wikipedia.org/wiki/Date_of_Easter#Gauss's_Easter_algorithm>
fn good_friday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.rem_euclid(4);
    let c = year.rem_euclid(7);
    let k = year.div_euclid(100);
    let p = (13 + 8 * k).div_euclid(25);
    let q = k.div_euclid(4);
    let m = (15 - p + k - q).rem_euclid(30);
    let n = (4 + k - q).rem_euclid(7);
    let d = (19 * a + m).rem_euclid(30);
    let e = (2 * b + 4 * c + 6 * d + n).rem_euclid(7);

    let easter = if d == 29 && e == 6 {
        NaiveDate::from_ymd_opt(year, 4, 19)?
    } else if d == 28 && e == 6 && (11 * m + 11).rem_euclid(30) < 19 {
        NaiveDate::from_ymd_opt(year, 4, 18)?
    } else {
        let march_day = 22 + d + e;
        if march_day <= 31 {
            NaiveDate::from_ymd_opt(year, 3, march_day as u32)?
        } else {
            NaiveDate::from_ymd_opt(year, 4, (march_day - 31) as u32)?
        }
    };

    easter.pred_opt()?.pred_opt()
}

// ---------------------------------------------------------------------------
// HolidayMemo
// ---------------------------------------------------------------------------

/// Append-only, per-year memo of every [`Holiday`] rule.
///
/// Safe to share across threads. Two callers racing on an unseen year may
/// both compute it; the first insert wins and both results are identical.
#[derive(Debug, Default)]
pub struct HolidayMemo {
    years: RwLock<HashMap<i32, Arc<[(Holiday, NaiveDate)]>>>,
}

impl HolidayMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// All holidays observed in `year`, computing and storing them on first
    /// access.
    pub fn holidays_in(&self, year: i32) -> Arc<[(Holiday, NaiveDate)]> {
        if let Some(known) = self.years.read().get(&year) {
            return Arc::clone(known);
        }

        let computed: Arc<[(Holiday, NaiveDate)]> = Holiday::ALL
            .iter()
            .filter_map(|h| h.observed_in(year).map(|date| (*h, date)))
            .collect();

        Arc::clone(self.years.write().entry(year).or_insert(computed))
    }

    /// The holiday observed on `date`, if any.
    pub fn holiday_on(&self, date: NaiveDate) -> Option<Holiday> {
        self.holidays_in(date.year())
            .iter()
            .find(|(_, observed)| *observed == date)
            .map(|(holiday, _)| *holiday)
    }

    /// Number of years computed so far.
    pub fn memoized_years(&self) -> usize {
        self.years.read().len()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn observed_dates_2022_and_2023() {
        let cases = [
            (Holiday::NewYearsDay, 2023, ymd(2023, 1, 2)),
            (Holiday::Juneteenth, 2022, ymd(2022, 6, 20)),
            (Holiday::Juneteenth, 2023, ymd(2023, 6, 19)),
            (Holiday::IndependenceDay, 2022, ymd(2022, 7, 4)),
            (Holiday::IndependenceDay, 2026, ymd(2026, 7, 3)),
            (Holiday::Christmas, 2022, ymd(2022, 12, 26)),
            (Holiday::Christmas, 2021, ymd(2021, 12, 24)),
            (Holiday::MartinLutherKingJr, 2022, ymd(2022, 1, 17)),
            (Holiday::MartinLutherKingJr, 2023, ymd(2023, 1, 16)),
            (Holiday::WashingtonsBirthday, 2022, ymd(2022, 2, 21)),
            (Holiday::WashingtonsBirthday, 2023, ymd(2023, 2, 20)),
            (Holiday::LaborDay, 2022, ymd(2022, 9, 5)),
            (Holiday::LaborDay, 2023, ymd(2023, 9, 4)),
            (Holiday::Thanksgiving, 2022, ymd(2022, 11, 24)),
            (Holiday::Thanksgiving, 2023, ymd(2023, 11, 23)),
            (Holiday::MemorialDay, 2022, ymd(2022, 5, 30)),
            (Holiday::MemorialDay, 2023, ymd(2023, 5, 29)),
            (Holiday::MemorialDay, 2008, ymd(2008, 5, 26)),
        ];

        for (holiday, year, expected) in cases {
            assert_eq!(
                holiday.observed_in(year),
                Some(expected),
                "{holiday} in {year}"
            );
        }
    }

    #[test]
    fn saturday_new_year_is_observed_in_previous_year() {
        // 2022-01-01 was a Saturday.
        assert_eq!(
            Holiday::NewYearsDay.observed_in(2022),
            Some(ymd(2021, 12, 31))
        );

        // Lookups are keyed by the queried date's own year, so 2021-12-31
        // is not a holiday.
        let memo = HolidayMemo::new();
        assert_eq!(memo.holiday_on(ymd(2021, 12, 31)), None);
    }

    #[test]
    fn good_friday_matches_known_dates() {
        let cases = [
            (2008, ymd(2008, 3, 21)),
            (2012, ymd(2012, 4, 6)),
            (2022, ymd(2022, 4, 15)),
            (2023, ymd(2023, 4, 7)),
            (2024, ymd(2024, 3, 29)),
            (2025, ymd(2025, 4, 18)),
            (2026, ymd(2026, 4, 3)),
            // Gauss exceptions: Easter on April 19 and April 18.
            (1981, ymd(1981, 4, 17)),
            (2049, ymd(2049, 4, 16)),
        ];

        for (year, expected) in cases {
            assert_eq!(good_friday(year), Some(expected), "Good Friday {year}");
            assert_eq!(good_friday(year).map(|d| d.weekday()), Some(Weekday::Fri));
        }
    }

    #[test]
    fn fixed_holidays_never_fall_on_a_weekend() {
        for year in 1900..2200 {
            for holiday in [
                Holiday::NewYearsDay,
                Holiday::Juneteenth,
                Holiday::IndependenceDay,
                Holiday::Christmas,
            ] {
                let observed = holiday.observed_in(year).unwrap();
                assert!(
                    !matches!(observed.weekday(), Weekday::Sat | Weekday::Sun),
                    "{holiday} {year} observed on {observed}"
                );
            }
        }
    }

    #[test]
    fn memo_computes_each_year_once() {
        let memo = HolidayMemo::new();
        assert_eq!(memo.memoized_years(), 0);

        let first = memo.holidays_in(2022);
        let second = memo.holidays_in(2022);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), Holiday::ALL.len());

        memo.holidays_in(2023);
        assert_eq!(memo.memoized_years(), 2);
    }

    #[test]
    fn memo_finds_holiday_by_date() {
        let memo = HolidayMemo::new();
        assert_eq!(
            memo.holiday_on(ymd(2022, 11, 24)),
            Some(Holiday::Thanksgiving)
        );
        assert_eq!(memo.holiday_on(ymd(2022, 11, 25)), None);
    }
}
