use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;
use crate::api::rate_limiter::RateLimiter;
use crate::api::retry::RetryPolicy;
use crate::monitoring::metrics;

/// One provider's HTTP session: a pooled reqwest client plus the rate-limit
/// and retry machinery every call goes through.
///
/// Provider clients compose a transport and add typed endpoint methods on
/// top; the transport itself knows nothing about payload shapes beyond
/// deserializing JSON.
pub struct RestTransport {
    provider: &'static str,
    base_url: String,
    http: reqwest::Client,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    closed: AtomicBool,
}

impl RestTransport {
    pub fn new(
        provider: &'static str,
        base_url: String,
        headers: HeaderMap,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            limiter,
            retry,
            closed: AtomicBool::new(false),
        })
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// GET `path` and deserialize the JSON body, retrying transient failures
    /// per the configured policy. Waits on the provider's rate limiter before
    /// every try, including retries.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut attempt: u32 = 1;
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(ApiError::ClientClosed {
                    provider: self.provider,
                });
            }

            self.limiter.acquire().await;

            match self.execute(path, query).await {
                Ok(payload) => {
                    metrics::record_api_request(self.provider, "ok");
                    return Ok(payload);
                }
                Err(err) if err.is_retriable() && self.retry.allows_retry(attempt) => {
                    let delay = self.retry.next_delay(attempt + 1, err.retry_after());
                    tracing::warn!(
                        provider = self.provider,
                        path,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "🔄 transient provider failure, backing off"
                    );
                    metrics::record_api_retry(self.provider);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) if err.is_retriable() => {
                    metrics::record_api_request(self.provider, err.kind());
                    return Err(ApiError::RetriesExhausted {
                        provider: self.provider,
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    metrics::record_api_request(self.provider, err.kind());
                    return Err(err);
                }
            }
        }
    }

    /// Marks the transport closed; later calls fail with `ClientClosed`.
    /// Safe to call repeatedly. The underlying connection pool is released
    /// when the last clone of this client drops.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(provider = self.provider, "transport closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|err| self.classify_transport_error(err))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited {
                provider: self.provider,
                retry_after: parse_retry_after(response.headers()),
            });
        }
        if status.is_server_error() {
            return Err(ApiError::Server {
                provider: self.provider,
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Client {
                provider: self.provider,
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|err| {
            if err.is_decode() {
                ApiError::MalformedPayload {
                    provider: self.provider,
                    detail: err.to_string(),
                }
            } else {
                self.classify_transport_error(err)
            }
        })
    }

    fn classify_transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout {
                provider: self.provider,
            }
        } else {
            ApiError::Network {
                provider: self.provider,
                source: err,
            }
        }
    }
}

/// Integer-seconds form of the Retry-After header. The HTTP-date form is
/// rare on these APIs and is ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
