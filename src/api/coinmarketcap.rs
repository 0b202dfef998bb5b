use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::api::client::RestTransport;
use crate::api::error::ApiError;
use crate::api::rate_limiter::RateLimiter;
use crate::api::retry::RetryPolicy;
use crate::api::types::{CmcQuoteResponse, DexPairsResponse};
use crate::core::config::ProviderConfig;

pub const CMC_PROVIDER: &str = "coinmarketcap";
pub const DEX_PROVIDER: &str = "cmc_dex";

const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// Typed CoinMarketCap spot surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoinMarketCapApi: Send + Sync {
    /// Latest quotes for the given symbols in one convert currency.
    async fn quotes_latest(
        &self,
        symbols: &[String],
        convert: &str,
    ) -> Result<CmcQuoteResponse, ApiError>;

    async fn close(&self);
}

/// Typed CoinMarketCap DEX surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DexApi: Send + Sync {
    /// Latest spot-pair snapshots across tracked networks.
    async fn spot_pairs_latest(&self, limit: u32) -> Result<DexPairsResponse, ApiError>;

    async fn close(&self);
}

fn cmc_headers(cfg: &ProviderConfig, provider: &'static str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    match cfg.api_key.as_deref() {
        Some(key) => {
            headers.insert(API_KEY_HEADER, HeaderValue::from_str(key)?);
        }
        None => {
            tracing::warn!(provider, "no API key configured, requests will be rejected upstream");
        }
    }
    Ok(headers)
}

pub struct CoinMarketCapClient {
    transport: RestTransport,
}

impl CoinMarketCapClient {
    pub fn new(cfg: &ProviderConfig, retry: RetryPolicy, timeout: Duration) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::per_minute(
            CMC_PROVIDER,
            cfg.rate_limit_per_minute,
        ));
        let transport = RestTransport::new(
            CMC_PROVIDER,
            cfg.base_url.clone(),
            cmc_headers(cfg, CMC_PROVIDER)?,
            limiter,
            retry,
            timeout,
        )?;
        Ok(Self { transport })
    }
}

#[async_trait]
impl CoinMarketCapApi for CoinMarketCapClient {
    async fn quotes_latest(
        &self,
        symbols: &[String],
        convert: &str,
    ) -> Result<CmcQuoteResponse, ApiError> {
        self.transport
            .get_json(
                "/cryptocurrency/quotes/latest",
                &[
                    ("symbol", symbols.join(",")),
                    ("convert", convert.to_string()),
                ],
            )
            .await
    }

    async fn close(&self) {
        self.transport.close();
    }
}

pub struct CmcDexClient {
    transport: RestTransport,
}

impl CmcDexClient {
    pub fn new(cfg: &ProviderConfig, retry: RetryPolicy, timeout: Duration) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::per_minute(
            DEX_PROVIDER,
            cfg.rate_limit_per_minute,
        ));
        let transport = RestTransport::new(
            DEX_PROVIDER,
            cfg.base_url.clone(),
            cmc_headers(cfg, DEX_PROVIDER)?,
            limiter,
            retry,
            timeout,
        )?;
        Ok(Self { transport })
    }
}

#[async_trait]
impl DexApi for CmcDexClient {
    async fn spot_pairs_latest(&self, limit: u32) -> Result<DexPairsResponse, ApiError> {
        self.transport
            .get_json("/dex/spot-pairs/latest", &[("limit", limit.to_string())])
            .await
    }

    async fn close(&self) {
        self.transport.close();
    }
}
