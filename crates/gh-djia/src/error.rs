use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

/// Failure of a single endpoint. Never fatal on its own.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("{endpoint} has no data (404): {body:?}")]
    NotFound { endpoint: String, body: String },

    #[error("{endpoint} fails with unexpected status code {status}")]
    Status { endpoint: String, status: u16 },

    #[error("{endpoint} request failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned a non-numeric body {body:?}")]
    Parse { endpoint: String, body: String },

    #[error("{endpoint} did not answer within {after:?}")]
    Timeout { endpoint: String, after: Duration },
}

impl SourceError {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::NotFound { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Transport { endpoint, .. }
            | Self::Parse { endpoint, .. }
            | Self::Timeout { endpoint, .. } => endpoint,
        }
    }

    /// HTTP status the endpoint answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Status { status, .. } => Some(*status),
            Self::Parse { .. } => Some(200),
            Self::Transport { .. } | Self::Timeout { .. } => None,
        }
    }
}

/// Failure to produce a DJIA value for a date.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Every endpoint failed; one entry per endpoint.
    #[error("no DJIA available for {date}: {}", join(.errors))]
    NoDataAvailable {
        date: NaiveDate,
        errors: Vec<SourceError>,
    },

    /// The caller cancelled the lookup.
    #[error("DJIA lookup for {date} was cancelled")]
    Cancelled { date: NaiveDate },
}

/// Invalid [`Fetcher`](crate::Fetcher) setup, reported at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetcherConfigError {
    #[error("at least one DJIA endpoint template is required")]
    NoEndpoints,

    #[error("invalid DJIA endpoint template {template:?}: bad strftime specifier")]
    InvalidTemplate { template: String },
}

fn join(errors: &[SourceError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_lists_every_endpoint() {
        let err = FetchError::NoDataAvailable {
            date: NaiveDate::from_ymd_opt(3000, 1, 1).unwrap(),
            errors: vec![
                SourceError::NotFound {
                    endpoint: "http://a/djia/3000/01/01".to_string(),
                    body: "not yet".to_string(),
                },
                SourceError::Status {
                    endpoint: "http://b/djia/3000/01/01".to_string(),
                    status: 503,
                },
            ],
        };

        assert_eq!(
            err.to_string(),
            "no DJIA available for 3000-01-01: \
             http://a/djia/3000/01/01 has no data (404): \"not yet\"; \
             http://b/djia/3000/01/01 fails with unexpected status code 503"
        );
    }

    #[test]
    fn status_and_endpoint_of_each_failure() {
        let url = "http://a/djia/2022/01/03";
        let cases = [
            (
                SourceError::NotFound {
                    endpoint: url.to_string(),
                    body: String::new(),
                },
                Some(404),
            ),
            (
                SourceError::Status {
                    endpoint: url.to_string(),
                    status: 503,
                },
                Some(503),
            ),
            (
                SourceError::Parse {
                    endpoint: url.to_string(),
                    body: "n/a".to_string(),
                },
                Some(200),
            ),
            (
                SourceError::Transport {
                    endpoint: url.to_string(),
                    message: "endpoint task panicked".to_string(),
                },
                None,
            ),
            (
                SourceError::Timeout {
                    endpoint: url.to_string(),
                    after: Duration::from_secs(10),
                },
                None,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.endpoint(), url);
            assert_eq!(err.status(), status, "{err}");
        }
    }
}
