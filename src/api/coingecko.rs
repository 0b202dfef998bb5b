use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::api::client::RestTransport;
use crate::api::error::ApiError;
use crate::api::rate_limiter::RateLimiter;
use crate::api::retry::RetryPolicy;
use crate::api::types::{CoinListEntry, CoinMarket, ExchangeInfo, TrendingResponse};
use crate::core::config::ProviderConfig;

pub const PROVIDER: &str = "coingecko";

/// Typed CoinGecko surface the coordinator consumes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoinGeckoApi: Send + Sync {
    /// Market snapshots ordered by market cap, one page.
    async fn coin_markets(
        &self,
        vs_currency: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<CoinMarket>, ApiError>;

    /// Full asset catalog (id, symbol, name).
    async fn coin_list(&self) -> Result<Vec<CoinListEntry>, ApiError>;

    /// Currently trending assets.
    async fn trending(&self) -> Result<TrendingResponse, ApiError>;

    /// Exchange directory, one page.
    async fn exchanges(&self, per_page: u32, page: u32) -> Result<Vec<ExchangeInfo>, ApiError>;

    /// Releases the session; the client rejects calls afterwards.
    async fn close(&self);
}

pub struct CoinGeckoClient {
    transport: RestTransport,
}

impl CoinGeckoClient {
    pub fn new(cfg: &ProviderConfig, retry: RetryPolicy, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = cfg.api_key.as_deref() {
            headers.insert("x-cg-demo-api-key", HeaderValue::from_str(key)?);
        }
        let limiter = Arc::new(RateLimiter::per_minute(PROVIDER, cfg.rate_limit_per_minute));
        let transport = RestTransport::new(
            PROVIDER,
            cfg.base_url.clone(),
            headers,
            limiter,
            retry,
            timeout,
        )?;
        Ok(Self { transport })
    }
}

#[async_trait]
impl CoinGeckoApi for CoinGeckoClient {
    async fn coin_markets(
        &self,
        vs_currency: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<CoinMarket>, ApiError> {
        self.transport
            .get_json(
                "/coins/markets",
                &[
                    ("vs_currency", vs_currency.to_string()),
                    ("order", "market_cap_desc".to_string()),
                    ("per_page", per_page.to_string()),
                    ("page", page.to_string()),
                    ("sparkline", "false".to_string()),
                ],
            )
            .await
    }

    async fn coin_list(&self) -> Result<Vec<CoinListEntry>, ApiError> {
        self.transport.get_json("/coins/list", &[]).await
    }

    async fn trending(&self) -> Result<TrendingResponse, ApiError> {
        self.transport.get_json("/search/trending", &[]).await
    }

    async fn exchanges(&self, per_page: u32, page: u32) -> Result<Vec<ExchangeInfo>, ApiError> {
        self.transport
            .get_json(
                "/exchanges",
                &[
                    ("per_page", per_page.to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await
    }

    async fn close(&self) {
        self.transport.close();
    }
}
