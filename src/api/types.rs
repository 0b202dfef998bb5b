use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry from CoinGecko `/coins/markets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<i64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub price_change_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// One entry from CoinGecko `/coins/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinListEntry {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

/// CoinGecko `/search/trending` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingResponse {
    #[serde(default)]
    pub coins: Vec<TrendingCoin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingCoin {
    pub item: TrendingItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingItem {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub market_cap_rank: Option<i64>,
    /// Zero-based position in the trending list.
    #[serde(default)]
    pub score: Option<i64>,
}

/// One entry from CoinGecko `/exchanges`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub year_established: Option<i32>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub trust_score: Option<i32>,
    #[serde(default)]
    pub trade_volume_24h_btc: Option<f64>,
}

/// CoinMarketCap `/cryptocurrency/quotes/latest` envelope, keyed by symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmcQuoteResponse {
    #[serde(default)]
    pub data: HashMap<String, CmcAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmcAsset {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub cmc_rank: Option<i64>,
    #[serde(default)]
    pub quote: HashMap<String, CmcQuote>,
}

/// Per-currency quote block inside a CMC asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmcQuote {
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub volume_24h: Option<f64>,
    #[serde(default)]
    pub percent_change_24h: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// CoinMarketCap DEX `/dex/spot-pairs/latest` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexPairsResponse {
    #[serde(default)]
    pub data: Vec<DexPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexPair {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub base_asset_symbol: Option<String>,
    #[serde(default)]
    pub quote_asset_symbol: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub network_slug: Option<String>,
    #[serde(default)]
    pub dex_slug: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub volume_24h: Option<f64>,
    #[serde(default)]
    pub liquidity: Option<f64>,
    #[serde(default)]
    pub percent_change_24h: Option<f64>,
    #[serde(default)]
    pub num_transactions_24h: Option<i64>,
}
