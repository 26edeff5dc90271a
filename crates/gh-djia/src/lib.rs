//! gh-djia
//!
//! Dow Jones Industrial Average (DJIA) lookup for a single trading day.
//!
//! [`IndicatorSource`] is the seam: the HTTP [`Fetcher`] races remote
//! endpoints, [`DjiaCache`] memoizes any source in a small LRU, and
//! [`StaticSource`] serves fixed values for offline use and tests.

mod cache;
mod error;
mod fetcher;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

pub use cache::{DjiaCache, DEFAULT_CAPACITY};
pub use error::{FetchError, FetcherConfigError, SourceError};
pub use fetcher::{Fetcher, DEFAULT_ENDPOINTS, DEFAULT_TIMEOUT};

/// Provider of the DJIA value for a trading day.
///
/// Object safe so callers can hold an `Arc<dyn IndicatorSource>`.
#[async_trait::async_trait]
pub trait IndicatorSource: Send + Sync {
    /// Short name used in logs (e.g. `"http"`).
    fn source_name(&self) -> &'static str;

    /// The DJIA for `date`. Implementations doing IO must stop when `cancel`
    /// fires.
    async fn indicator(&self, date: NaiveDate, cancel: &CancellationToken)
        -> Result<f64, FetchError>;
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

/// In-memory source with fixed values per date, or one value for every date.
///
/// Counts every lookup, which lets callers verify that a cache in front of it
/// did its job.
#[derive(Debug, Default)]
pub struct StaticSource {
    values: HashMap<NaiveDate, f64>,
    fallback: Option<f64>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `value` for every date.
    pub fn constant(value: f64) -> Self {
        Self {
            fallback: Some(value),
            ..Self::default()
        }
    }

    /// Serve `value` for `date`.
    pub fn with(mut self, date: NaiveDate, value: f64) -> Self {
        self.values.insert(date, value);
        self
    }

    /// Number of lookups served so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl IndicatorSource for StaticSource {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn indicator(
        &self,
        date: NaiveDate,
        _cancel: &CancellationToken,
    ) -> Result<f64, FetchError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.values
            .get(&date)
            .copied()
            .or(self.fallback)
            .ok_or_else(|| FetchError::NoDataAvailable {
                date,
                errors: vec![SourceError::NotFound {
                    endpoint: "static".to_string(),
                    body: String::new(),
                }],
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn static_source_serves_known_dates() {
        let source = StaticSource::new().with(ymd(2005, 5, 26), 10458.68);
        let cancel = CancellationToken::new();

        assert_eq!(
            source.indicator(ymd(2005, 5, 26), &cancel).await.unwrap(),
            10458.68
        );

        let err = source.indicator(ymd(2005, 5, 27), &cancel).await.unwrap_err();
        assert!(matches!(err, FetchError::NoDataAvailable { date, .. } if date == ymd(2005, 5, 27)));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn constant_source_serves_every_date() {
        let source = StaticSource::constant(12981.20);
        let cancel = CancellationToken::new();
        assert_eq!(
            source.indicator(ymd(1999, 1, 1), &cancel).await.unwrap(),
            12981.20
        );
    }

    #[test]
    fn source_is_object_safe_via_box() {
        let _s: Box<dyn IndicatorSource> = Box::new(StaticSource::new());
    }
}
