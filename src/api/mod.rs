pub mod client;
pub mod coingecko;
pub mod coinmarketcap;
pub mod error;
pub mod rate_limiter;
pub mod retry;
pub mod types;

pub use client::RestTransport;
pub use coingecko::{CoinGeckoApi, CoinGeckoClient};
pub use coinmarketcap::{CmcDexClient, CoinMarketCapApi, CoinMarketCapClient, DexApi};
pub use error::ApiError;
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use types::*;
