//! Shared runtime state for the exporter.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The engine owns the
//! DJIA cache, so every request shares it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gh_hash::GeohashEngine;

/// Source of "now". Tests pin it to a fixed instant.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Static build metadata included in health responses.
#[derive(Clone, Copy, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            service: "geohashing-exporter",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub engine: GeohashEngine,
    /// Upper bound for computing one `/metrics` answer.
    pub request_timeout: Duration,
    clock: Clock,
}

impl AppState {
    pub fn new(engine: GeohashEngine, request_timeout: Duration) -> Self {
        Self {
            build: BuildInfo::current(),
            engine,
            request_timeout,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
