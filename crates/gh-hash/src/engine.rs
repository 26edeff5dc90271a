//! Geohash engine: trading-day selection, DJIA lookup and MD5 derivation.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use gh_calendar::{is_before_market_open, shift_days, MarketCalendar};
use gh_djia::IndicatorSource;
use md5::{Digest, Md5};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::types::{Cell, Coordinates, GeohashError};

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

#[derive(Clone)]
pub struct GeohashEngine {
    calendar: Arc<MarketCalendar>,
    djia: Arc<dyn IndicatorSource>,
}

impl GeohashEngine {
    pub fn new(calendar: Arc<MarketCalendar>, djia: Arc<dyn IndicatorSource>) -> Self {
        Self { calendar, djia }
    }

    pub fn calendar(&self) -> &MarketCalendar {
        &self.calendar
    }

    /// The trading instant whose DJIA opening value drives `cell` on `date`.
    ///
    /// East of 30W the previous day is used; at and west of 30W the same day,
    /// unless the market has not opened yet on a trading day.
    pub fn query_date(
        &self,
        cell: Cell,
        date: DateTime<Tz>,
    ) -> Result<DateTime<Tz>, GeohashError> {
        let day = date.date_naive();
        let candidate = if !cell.is_west_of_30w() {
            shift_days(date, -1)
        } else if is_before_market_open(&date) && !self.calendar.is_closed_on(day) {
            return Err(GeohashError::ThirtyWestNotYetAvailable { cell, date: day });
        } else {
            date
        };

        self.calendar
            .correct(candidate)
            .map_err(|error| GeohashError::Calendar {
                cell,
                date: day,
                error,
            })
    }

    /// Geohash of `cell` on `date`. The date's own zone decides its civil day.
    pub async fn cell(
        &self,
        cell: Cell,
        date: DateTime<Tz>,
        cancel: &CancellationToken,
    ) -> Result<Coordinates, GeohashError> {
        let query = self.query_date(cell, date)?;
        self.locate(cell, date, query.date_naive(), cancel).await
    }

    /// Globalhash of `date`: the (0,0) geohash of the date's UTC midnight
    /// stretched over the whole globe.
    pub async fn global(
        &self,
        date: DateTime<Tz>,
        cancel: &CancellationToken,
    ) -> Result<Coordinates, GeohashError> {
        let origin = self.cell(Cell::ORIGIN, global_date(&date), cancel).await?;
        Ok(globalize(origin))
    }

    /// `date`'s geohash followed by every later day already computable from
    /// the same trading day, e.g. a whole weekend on Friday.
    pub async fn cell_next(
        &self,
        cell: Cell,
        date: DateTime<Tz>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Coordinates>, GeohashError> {
        let mut date = date;
        let mut out = Vec::new();

        loop {
            let base = self.query_date(cell, date)?.date_naive();
            out.push(self.locate(cell, date, base, cancel).await?);

            date = shift_days(date, 1);
            match self.query_date(cell, date) {
                Err(err) if err.is_pending() => break,
                Err(err) => return Err(err),
                Ok(next) if next.date_naive() > base => break,
                Ok(_) => {}
            }
        }

        debug!(%cell, days = out.len(), "geohash sequence");
        Ok(out)
    }

    /// [`GeohashEngine::cell_next`] for the globalhash.
    pub async fn global_next(
        &self,
        date: DateTime<Tz>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Coordinates>, GeohashError> {
        let origins = self
            .cell_next(Cell::ORIGIN, global_date(&date), cancel)
            .await?;
        Ok(origins.into_iter().map(globalize).collect())
    }

    async fn locate(
        &self,
        cell: Cell,
        date: DateTime<Tz>,
        djia_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Coordinates, GeohashError> {
        let day = date.date_naive();
        let djia = self
            .djia
            .indicator(djia_date, cancel)
            .await
            .map_err(|error| GeohashError::Indicator {
                cell,
                date: day,
                djia_date,
                error,
            })?;

        let (lat_frac, lon_frac) = hash_fractions(day, djia);
        trace!(%cell, %day, %djia_date, djia, "geohash computed");
        Ok(Coordinates {
            lat: place(cell.lat, lat_frac),
            lon: place(cell.lon, lon_frac),
        })
    }
}

impl std::fmt::Debug for GeohashEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeohashEngine")
            .field("djia", &self.djia.source_name())
            .finish_non_exhaustive()
    }
}

/// Fractions in `[0, 1)` from `MD5("YYYY-MM-DD-<djia to 2 decimals>")`:
/// the first digest half for latitude, the second for longitude, each read
/// as a big-endian integer over 2^64.
pub fn hash_fractions(date: NaiveDate, djia: f64) -> (f64, f64) {
    let message = format!("{}-{:.2}", date.format("%Y-%m-%d"), djia);
    let digest = Md5::digest(message.as_bytes());
    let (hi, lo) = digest.split_at(8);
    (fraction(hi), fraction(lo))
}

fn fraction(half: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(half);
    u64::from_be_bytes(buf) as f64 / TWO_POW_64
}

/// Appends `fraction` away from zero, keeping the sign of `area`. Area 0 is
/// positive.
fn place(area: i32, fraction: f64) -> f64 {
    let area = f64::from(area);
    (area.abs() + fraction).copysign(area)
}

/// UTC midnight of `date`'s civil day.
pub fn global_date(date: &DateTime<Tz>) -> DateTime<Tz> {
    chrono_tz::UTC.from_utc_datetime(&date.date_naive().and_time(NaiveTime::MIN))
}

/// Maps a (0,0) geohash onto the globe.
pub fn globalize(origin: Coordinates) -> Coordinates {
    Coordinates {
        lat: origin.lat * 180.0 - 90.0,
        lon: origin.lon * 360.0 - 180.0,
    }
}
