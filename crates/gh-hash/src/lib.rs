//! gh-hash
//!
//! 30W compatible implementation of the xkcd Geohashing algorithm,
//! <https://xkcd.com/426/>.
//!
//! The engine picks the DJIA trading day for a cell and date (30W rule plus
//! NYSE calendar), looks the value up through an [`IndicatorSource`] and
//! turns `MD5("<date>-<djia>")` into the fractional part of the coordinates.

mod engine;
mod types;

pub use engine::{global_date, globalize, hash_fractions, GeohashEngine};
pub use types::{Cell, Coordinates, GeohashError, THIRTY_WEST};

pub use gh_djia::IndicatorSource;
