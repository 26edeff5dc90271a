//! Gauge collection and Prometheus text rendering for `/metrics`.
//!
//! Every request gets its own recorder, so the output holds exactly the
//! gauges computed for that request's cell and time zone.

use chrono::DateTime;
use chrono_tz::Tz;
use futures_util::future::join_all;
use gh_hash::{Cell, Coordinates, GeohashEngine, GeohashError};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const LAT_GAUGE: &str = "geohashing_lat";
pub const LON_GAUGE: &str = "geohashing_lon";

/// `location` label of the globalhash.
pub const GLOBAL: &str = "global";

/// `location` label and (lat, lon) offset of the cells around the requested one.
pub const NEIGHBORS: [(&str, i32, i32); 9] = [
    ("nw", 1, -1),
    ("n", 1, 0),
    ("ne", 1, 1),
    ("w", 0, -1),
    ("center", 0, 0),
    ("e", 0, 1),
    ("sw", -1, -1),
    ("s", -1, 0),
    ("se", -1, 1),
];

/// One geohash, labelled for export.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub location: &'static str,
    /// Days after the requested date.
    pub day_offset: usize,
    pub coords: Coordinates,
}

/// Next-sequences of the nine cells around `center` and of the globalhash,
/// all computed concurrently under one cancellation token.
///
/// Cells still waiting for the NYSE opening (30W rule) are left out.
pub async fn collect(
    engine: &GeohashEngine,
    center: Cell,
    now: DateTime<Tz>,
    cancel: &CancellationToken,
) -> Result<Vec<Reading>, GeohashError> {
    let neighbors = join_all(NEIGHBORS.iter().map(|&(location, d_lat, d_lon)| async move {
        let cell = center.offset(d_lat, d_lon);
        (location, engine.cell_next(cell, now, cancel).await)
    }));
    let global = async { (GLOBAL, engine.global_next(now, cancel).await) };

    let (mut sequences, global) = tokio::join!(neighbors, global);
    sequences.push(global);

    let mut readings = Vec::new();
    for (location, sequence) in sequences {
        match sequence {
            Ok(days) => readings.extend(days.into_iter().enumerate().map(
                |(day_offset, coords)| Reading {
                    location,
                    day_offset,
                    coords,
                },
            )),
            Err(err) if err.is_pending() => {
                debug!(location, error = %err, "geohash not yet available, skipped");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(readings)
}

/// Prometheus text exposition of `readings`.
pub fn render(readings: &[Reading]) -> String {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    metrics::with_local_recorder(&recorder, || {
        describe_gauge!(LAT_GAUGE, "Latitude of the geohash.");
        describe_gauge!(LON_GAUGE, "Longitude of the geohash.");

        for r in readings {
            let day_offset = r.day_offset.to_string();
            gauge!(LAT_GAUGE, "location" => r.location, "day_offset" => day_offset.clone())
                .set(r.coords.lat);
            gauge!(LON_GAUGE, "location" => r.location, "day_offset" => day_offset)
                .set(r.coords.lon);
        }
    });

    handle.render()
}
