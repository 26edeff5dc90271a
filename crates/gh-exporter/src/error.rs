use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gh_hash::GeohashError;
use thiserror::Error;
use tracing::warn;

/// Errors answered by `GET /metrics`, as plain text.
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("`{name}` GET parameter is missing")]
    MissingParam { name: &'static str },

    #[error("cannot parse `{name}` GET parameter as an integer: {value:?}")]
    NotAnInteger { name: &'static str, value: String },

    #[error("`{name}` GET parameter is out of range: {value}")]
    OutOfRange { name: &'static str, value: i32 },

    #[error("`tz` GET parameter is not a known time zone: {0:?}")]
    UnknownZone(String),

    #[error("cannot create gauges: {}", chain(.0))]
    Geohash(#[from] GeohashError),

    #[error("cannot create gauges within {0:?}")]
    Timeout(Duration),
}

impl ExporterError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParam { .. }
            | Self::NotAnInteger { .. }
            | Self::OutOfRange { .. }
            | Self::UnknownZone(_) => StatusCode::BAD_REQUEST,
            Self::Geohash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ExporterError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(%status, error = %self, "metrics request failed");
        }
        (status, self.to_string()).into_response()
    }
}

/// `err: cause: cause ...`
fn chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
