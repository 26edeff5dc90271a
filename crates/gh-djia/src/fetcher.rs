//! HTTP DJIA fetcher racing several date-templated endpoints.
//!
//! The recommended API is geo.crox.net,
//! <https://geohashing.site/geohashing/Dow_Jones_Industrial_Average#geo.crox.net_.28recommended.29>.
//! It answers `GET /djia/YYYY/MM/DD` with the plain-text value and 404 if
//! there is no value for that date.
//!
//! Every endpoint gets its own task on a [`JoinSet`], bound to a child of the
//! caller's [`CancellationToken`]. The first numeric answer wins and cancels
//! the rest; leaving [`Fetcher::indicator`] for any reason aborts every task
//! still running.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use futures_util::FutureExt;
use reqwest::StatusCode;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{FetchError, FetcherConfigError, SourceError};
use crate::IndicatorSource;

/// strftime templates used when none are configured.
pub const DEFAULT_ENDPOINTS: &[&str] = &["http://geo.crox.net/djia/%Y/%m/%d"];

/// Deadline shared by all endpoints of one lookup.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Fetcher {
    http: reqwest::Client,
    templates: Arc<[String]>,
    timeout: Duration,
}

impl Fetcher {
    /// Fetcher for the given strftime URL templates, e.g.
    /// `http://geo.crox.net/djia/%Y/%m/%d`.
    pub fn new<I, S>(templates: I, timeout: Duration) -> Result<Self, FetcherConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let templates: Arc<[String]> = templates.into_iter().map(Into::into).collect();
        if templates.is_empty() {
            return Err(FetcherConfigError::NoEndpoints);
        }
        if let Some(bad) = templates.iter().find(|t| !is_valid_template(t)) {
            return Err(FetcherConfigError::InvalidTemplate {
                template: bad.clone(),
            });
        }

        Ok(Self {
            http: reqwest::Client::new(),
            templates,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Concrete URLs for `date`, one per template, in configuration order.
    pub fn endpoint_urls(&self, date: NaiveDate) -> Vec<String> {
        self.templates
            .iter()
            .map(|t| date.format(t).to_string())
            .collect()
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
            templates: DEFAULT_ENDPOINTS.iter().map(|t| t.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[async_trait::async_trait]
impl IndicatorSource for Fetcher {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn indicator(
        &self,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<f64, FetchError> {
        let urls = self.endpoint_urls(date);
        let race = cancel.child_token();
        let _stop_losers = race.clone().drop_guard();

        let mut tasks = JoinSet::new();
        for (idx, url) in urls.iter().cloned().enumerate() {
            debug!(%date, %url, "querying DJIA endpoint");
            let http = self.http.clone();
            let token = race.clone();
            tasks.spawn(async move {
                let outcome = tokio::select! {
                    _ = token.cancelled() => None,
                    res = contain_panic(&url, fetch_one(&http, &url)) => Some(res),
                };
                (idx, outcome)
            });
        }

        let mut failures: Vec<Option<SourceError>> = vec![None; urls.len()];
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    return Err(FetchError::Cancelled { date });
                }
                _ = &mut deadline => {
                    warn!(%date, timeout = ?self.timeout, "DJIA endpoints exceeded deadline");
                    break;
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((idx, Some(Ok(value))))) => {
                        debug!(%date, url = %urls[idx], value, "DJIA fetched");
                        race.cancel();
                        return Ok(value);
                    }
                    Some(Ok((idx, Some(Err(err))))) => {
                        warn!(
                            %date,
                            url = %urls[idx],
                            status = ?err.status(),
                            error = %err,
                            "DJIA endpoint failed"
                        );
                        failures[idx] = Some(err);
                    }
                    Some(Ok((_, None))) => {}
                    Some(Err(join_err)) => {
                        warn!(%date, error = %join_err, "DJIA endpoint task died");
                    }
                },
            }
        }

        let errors = failures
            .into_iter()
            .zip(urls)
            .map(|(failure, endpoint)| {
                failure.unwrap_or(SourceError::Timeout {
                    endpoint,
                    after: self.timeout,
                })
            })
            .collect();

        Err(FetchError::NoDataAvailable { date, errors })
    }
}

async fn fetch_one(http: &reqwest::Client, url: &str) -> Result<f64, SourceError> {
    let transport = |e: reqwest::Error| SourceError::Transport {
        endpoint: url.to_string(),
        message: e.to_string(),
    };

    let resp = http.get(url).send().await.map_err(transport)?;
    let status = resp.status();
    let body = resp.text().await.map_err(transport)?;

    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound {
            endpoint: url.to_string(),
            body,
        });
    }
    if status != StatusCode::OK {
        return Err(SourceError::Status {
            endpoint: url.to_string(),
            status: status.as_u16(),
        });
    }

    match body.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(SourceError::Parse {
            endpoint: url.to_string(),
            body,
        }),
    }
}

/// Runs `fetch`, turning a panic into a failure of `endpoint`.
async fn contain_panic<F>(endpoint: &str, fetch: F) -> Result<f64, SourceError>
where
    F: Future<Output = Result<f64, SourceError>>,
{
    match AssertUnwindSafe(fetch).catch_unwind().await {
        Ok(res) => res,
        Err(_) => Err(SourceError::Transport {
            endpoint: endpoint.to_string(),
            message: "endpoint task panicked".to_string(),
        }),
    }
}

fn is_valid_template(template: &str) -> bool {
    !StrftimeItems::new(template).any(|item| matches!(item, Item::Error))
}
