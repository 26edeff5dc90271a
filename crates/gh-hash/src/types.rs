use std::fmt;

use chrono::NaiveDate;
use gh_calendar::CalendarError;
use gh_djia::FetchError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longitude area at and west of which the 30W rule applies,
/// <https://geohashing.site/geohashing/30W_Time_Zone_Rule>.
pub const THIRTY_WEST: i32 = -30;

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A graticule: latitude and longitude reduced to whole degrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub lat: i32,
    pub lon: i32,
}

impl Cell {
    pub const fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    /// The cell used by the globalhash.
    pub const ORIGIN: Cell = Cell::new(0, 0);

    /// Same-day DJIA applies at and west of 30W.
    pub fn is_west_of_30w(&self) -> bool {
        self.lon <= THIRTY_WEST
    }

    /// Moves the cell by whole degrees, clamping at the `i32` range.
    pub fn offset(&self, d_lat: i32, d_lon: i32) -> Self {
        Self::new(
            self.lat.saturating_add(d_lat),
            self.lon.saturating_add(d_lon),
        )
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A geohash location in signed degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

// ---------------------------------------------------------------------------
// GeohashError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GeohashError {
    /// West of 30W before the NYSE opened on a trading day. Expected; retry
    /// after 09:30 New York time.
    #[error("coordinates for {cell} on {date} are not yet available, 30W rule")]
    ThirtyWestNotYetAvailable { cell: Cell, date: NaiveDate },

    #[error("cannot find the trading day for {cell} on {date}")]
    Calendar {
        cell: Cell,
        date: NaiveDate,
        #[source]
        error: CalendarError,
    },

    #[error("cannot get the DJIA of {djia_date} for {cell} on {date}")]
    Indicator {
        cell: Cell,
        date: NaiveDate,
        djia_date: NaiveDate,
        #[source]
        error: FetchError,
    },
}

impl GeohashError {
    /// `true` for the recoverable 30W case.
    pub fn is_pending(&self) -> bool {
        matches!(self, GeohashError::ThirtyWestNotYetAvailable { .. })
    }
}
