use std::time::Duration;
use thiserror::Error;

/// Failure classes for a single provider call.
///
/// The transport retry loop consults [`ApiError::is_retriable`]: rate limits
/// and transient transport faults may be tried again, everything else fails
/// the current fetch step immediately.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{provider} request timed out")]
    Timeout { provider: &'static str },

    #[error("{provider} network error: {source}")]
    Network {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} rate limited (HTTP 429), retry-after {retry_after:?}")]
    RateLimited {
        provider: &'static str,
        retry_after: Option<Duration>,
    },

    #[error("{provider} server error: HTTP {status}")]
    Server { provider: &'static str, status: u16 },

    #[error("{provider} rejected the request: HTTP {status}")]
    Client { provider: &'static str, status: u16 },

    #[error("{provider} returned a malformed payload: {detail}")]
    MalformedPayload {
        provider: &'static str,
        detail: String,
    },

    #[error("{provider} client is closed")]
    ClientClosed { provider: &'static str },

    #[error("{provider} gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        provider: &'static str,
        attempts: u32,
        #[source]
        last: Box<ApiError>,
    },
}

impl ApiError {
    /// Whether the retry policy is allowed to try this call again.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout { .. }
                | ApiError::Network { .. }
                | ApiError::RateLimited { .. }
                | ApiError::Server { .. }
        )
    }

    /// Provider-supplied wait hint, present only on rate-limit responses.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short tag for metrics labels and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Timeout { .. } => "timeout",
            ApiError::Network { .. } => "network",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Server { .. } => "server_error",
            ApiError::Client { .. } => "client_error",
            ApiError::MalformedPayload { .. } => "malformed_payload",
            ApiError::ClientClosed { .. } => "client_closed",
            ApiError::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classes_are_retriable() {
        assert!(ApiError::Timeout { provider: "test" }.is_retriable());
        assert!(ApiError::Server {
            provider: "test",
            status: 503
        }
        .is_retriable());
        assert!(ApiError::RateLimited {
            provider: "test",
            retry_after: None
        }
        .is_retriable());
    }

    #[test]
    fn permanent_classes_are_not_retriable() {
        assert!(!ApiError::Client {
            provider: "test",
            status: 404
        }
        .is_retriable());
        assert!(!ApiError::MalformedPayload {
            provider: "test",
            detail: "truncated body".to_string()
        }
        .is_retriable());
        assert!(!ApiError::ClientClosed { provider: "test" }.is_retriable());
    }

    #[test]
    fn retry_after_only_set_on_rate_limits() {
        let limited = ApiError::RateLimited {
            provider: "test",
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(
            ApiError::Server {
                provider: "test",
                status: 500
            }
            .retry_after(),
            None
        );
    }
}
