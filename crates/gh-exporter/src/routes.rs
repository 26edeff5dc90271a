//! Axum router and HTTP handlers for the exporter.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers, so the scenario tests in `tests/` can use the bare
//! router.

use std::ops::RangeInclusive;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono_tz::Tz;
use gh_hash::Cell;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{api_types::HealthResponse, error::ExporterError, gauges, state::AppState};

const LAT_RANGE: RangeInclusive<i32> = -90..=90;
const LON_RANGE: RangeInclusive<i32> = -180..=180;

/// Content type of the Prometheus text exposition format.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/v1/health", get(health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /metrics?lat=&lon=&tz=
// ---------------------------------------------------------------------------

/// Raw query string; parsed by hand so every failure names its parameter.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MetricsParams {
    lat: Option<String>,
    lon: Option<String>,
    tz: Option<String>,
}

impl MetricsParams {
    fn parse(&self) -> Result<(Cell, Tz), ExporterError> {
        let lat = parse_int("lat", self.lat.as_deref(), LAT_RANGE)?;
        let lon = parse_int("lon", self.lon.as_deref(), LON_RANGE)?;

        let tz = match self.tz.as_deref() {
            None | Some("") => return Err(ExporterError::MissingParam { name: "tz" }),
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ExporterError::UnknownZone(name.to_string()))?,
        };

        Ok((Cell::new(lat, lon), tz))
    }
}

fn parse_int(
    name: &'static str,
    raw: Option<&str>,
    range: RangeInclusive<i32>,
) -> Result<i32, ExporterError> {
    let raw = raw.ok_or(ExporterError::MissingParam { name })?;
    let value: i32 = raw
        .trim()
        .parse()
        .map_err(|_| ExporterError::NotAnInteger {
            name,
            value: raw.to_string(),
        })?;
    if !range.contains(&value) {
        return Err(ExporterError::OutOfRange { name, value });
    }
    Ok(value)
}

pub(crate) async fn metrics_handler(
    State(st): State<Arc<AppState>>,
    Query(params): Query<MetricsParams>,
) -> Result<Response, ExporterError> {
    let (cell, tz) = params.parse()?;
    let now = st.now().with_timezone(&tz);

    // Cancelled on every way out, including the client going away.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let collected = tokio::time::timeout(
        st.request_timeout,
        gauges::collect(&st.engine, cell, now, &cancel),
    )
    .await;

    let readings = match collected {
        Ok(readings) => readings?,
        Err(_) => {
            cancel.cancel();
            return Err(ExporterError::Timeout(st.request_timeout));
        }
    };

    info!(%cell, %tz, gauges = readings.len(), "metrics served");
    Ok((
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        gauges::render(&readings),
    )
        .into_response())
}
