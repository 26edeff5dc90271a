//! LRU cache in front of any [`IndicatorSource`].
//!
//! Keyed by calendar day. Entries never expire; only capacity pressure evicts.
//! The locks guard bookkeeping only and are never held across a fetch, so
//! misses for different dates run concurrently. Concurrent misses for the
//! same date share one in-flight fetch.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::NaiveDate;
use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::FetchError;
use crate::IndicatorSource;

/// Roughly two weeks of daily queries.
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(16) {
    Some(n) => n,
    None => panic!("cache capacity must be non-zero"),
};

type Inflight = Arc<OnceCell<f64>>;

pub struct DjiaCache {
    entries: Mutex<LruCache<NaiveDate, f64>>,
    inflight: Mutex<HashMap<NaiveDate, Inflight>>,
    source: Arc<dyn IndicatorSource>,
}

impl DjiaCache {
    pub fn new(source: Arc<dyn IndicatorSource>) -> Self {
        Self::with_capacity(source, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(source: Arc<dyn IndicatorSource>, capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            inflight: Mutex::new(HashMap::new()),
            source,
        }
    }

    /// Cached value for `date` without touching its recency.
    pub fn peek(&self, date: NaiveDate) -> Option<f64> {
        self.entries.lock().peek(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn join_inflight(&self, date: NaiveDate) -> InflightSlot<'_> {
        let cell = self.inflight.lock().entry(date).or_default().clone();
        InflightSlot {
            cache: self,
            date,
            cell,
        }
    }
}

/// Membership in the shared fetch for one date. The map entry goes away once
/// a member leaves, so a failed or abandoned fetch is not reused.
struct InflightSlot<'a> {
    cache: &'a DjiaCache,
    date: NaiveDate,
    cell: Inflight,
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        let mut inflight = self.cache.inflight.lock();
        if inflight
            .get(&self.date)
            .is_some_and(|cell| Arc::ptr_eq(cell, &self.cell))
        {
            inflight.remove(&self.date);
        }
    }
}

impl std::fmt::Debug for DjiaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DjiaCache")
            .field("len", &self.len())
            .field("source", &self.source.source_name())
            .finish()
    }
}

#[async_trait::async_trait]
impl IndicatorSource for DjiaCache {
    fn source_name(&self) -> &'static str {
        "cache"
    }

    async fn indicator(
        &self,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<f64, FetchError> {
        let hit = self.entries.lock().get(&date).copied();
        if let Some(value) = hit {
            trace!(%date, value, "DJIA cache hit");
            return Ok(value);
        }

        let slot = self.join_inflight(date);
        let value = *slot
            .cell
            .get_or_try_init(|| async {
                // Another member may have stored it since our first look.
                if let Some(value) = self.peek(date) {
                    return Ok(value);
                }
                debug!(%date, source = self.source.source_name(), "DJIA cache miss");
                let value = self.source.indicator(date, cancel).await?;
                self.entries.lock().put(date, value);
                Ok::<_, FetchError>(value)
            })
            .await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::Datelike;
    use tokio::sync::Notify;

    use super::*;
    use crate::StaticSource;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let source = Arc::new(StaticSource::new().with(ymd(2022, 1, 3), 36585.06));
        let cache = DjiaCache::new(source.clone());
        let cancel = CancellationToken::new();

        assert!(cache.is_empty());
        assert_eq!(cache.peek(ymd(2022, 1, 3)), None);

        let first = cache.indicator(ymd(2022, 1, 3), &cancel).await.unwrap();
        assert_eq!(cache.peek(ymd(2022, 1, 3)), Some(first));

        for _ in 0..1000 {
            let again = cache.indicator(ymd(2022, 1, 3), &cancel).await.unwrap();
            assert_eq!(again.to_bits(), first.to_bits());
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = Arc::new(StaticSource::new());
        let cache = DjiaCache::new(source.clone());
        let cancel = CancellationToken::new();

        assert!(cache.indicator(ymd(3000, 1, 1), &cancel).await.is_err());
        assert!(cache.indicator(ymd(3000, 1, 1), &cancel).await.is_err());
        assert!(cache.is_empty());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted() {
        let source = Arc::new(StaticSource::constant(1.0));
        let cache = DjiaCache::with_capacity(source.clone(), NonZeroUsize::new(2).unwrap());
        let cancel = CancellationToken::new();

        cache.indicator(ymd(2022, 1, 3), &cancel).await.unwrap();
        cache.indicator(ymd(2022, 1, 4), &cancel).await.unwrap();
        // Touch the 3rd so the 4th becomes the eviction candidate.
        cache.indicator(ymd(2022, 1, 3), &cancel).await.unwrap();
        cache.indicator(ymd(2022, 1, 5), &cancel).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.peek(ymd(2022, 1, 3)).is_some());
        assert!(cache.peek(ymd(2022, 1, 4)).is_none());
        assert!(cache.peek(ymd(2022, 1, 5)).is_some());
        assert_eq!(source.calls(), 3);
    }

    /// Stalls on one date until released; answers every other date at once.
    struct GatedSource {
        gated: NaiveDate,
        release: Arc<Notify>,
        calls: AtomicUsize,
    }

    impl GatedSource {
        fn new(gated: NaiveDate) -> Self {
            Self {
                gated,
                release: Arc::new(Notify::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl IndicatorSource for GatedSource {
        fn source_name(&self) -> &'static str {
            "gated"
        }

        async fn indicator(
            &self,
            date: NaiveDate,
            _cancel: &CancellationToken,
        ) -> Result<f64, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if date == self.gated {
                self.release.notified().await;
            }
            Ok(f64::from(date.day()))
        }
    }

    #[tokio::test]
    async fn pending_miss_does_not_block_other_dates() {
        let source = Arc::new(GatedSource::new(ymd(2022, 1, 3)));
        let cache = Arc::new(DjiaCache::new(source.clone()));
        let cancel = CancellationToken::new();

        let stuck = tokio::spawn({
            let cache = cache.clone();
            let cancel = cancel.clone();
            async move { cache.indicator(ymd(2022, 1, 3), &cancel).await }
        });
        while source.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let other = tokio::time::timeout(
            Duration::from_millis(500),
            cache.indicator(ymd(2022, 1, 4), &cancel),
        )
        .await
        .expect("lookup for another date was blocked");
        assert_eq!(other.unwrap(), 4.0);
        assert!(!stuck.is_finished());

        source.release.notify_one();
        assert_eq!(stuck.await.unwrap().unwrap(), 3.0);
    }

    #[tokio::test]
    async fn concurrent_misses_for_one_date_fetch_once() {
        let source = Arc::new(GatedSource::new(ymd(2022, 1, 3)));
        let cache = Arc::new(DjiaCache::new(source.clone()));
        let cancel = CancellationToken::new();

        let lookups: Vec<_> = (0..10)
            .map(|_| {
                let cache = cache.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { cache.indicator(ymd(2022, 1, 3), &cancel).await })
            })
            .collect();
        while source.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        // Let the other lookups reach the shared fetch before releasing it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        source.release.notify_one();

        for lookup in lookups {
            assert_eq!(lookup.await.unwrap().unwrap(), 3.0);
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek(ymd(2022, 1, 3)), Some(3.0));
    }

    #[test]
    fn default_capacity_is_sixteen() {
        assert_eq!(DEFAULT_CAPACITY.get(), 16);
    }
}
