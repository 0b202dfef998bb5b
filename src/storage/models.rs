use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upsert payload for the `assets` table, keyed by uppercase symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
    pub symbol: String,
    pub name: String,
    pub slug: Option<String>,
}

/// Upsert payload for the `venues` table, keyed by venue name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueRecord {
    pub name: String,
    pub country: Option<String>,
    pub url: Option<String>,
    pub trust_score: Option<f64>,
    pub trade_volume_24h_btc: Option<f64>,
    pub year_established: Option<i32>,
}

/// A price observation after transformation, before parent resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedPrice {
    pub symbol: String,
    pub name: String,
    pub quote_symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<i32>,
    pub source: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub symbol: String,
    pub name: String,
    /// 0.0..=1.0, derived from trending rank.
    pub score: f64,
    pub label: String,
    pub source: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexSnapshotRecord {
    pub contract_address: String,
    pub network_slug: String,
    pub dex_slug: Option<String>,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub price_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub volume_24h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Row ready for `price_history`; the trading pair is already resolved.
#[derive(Debug, Clone)]
pub struct PriceBarInsert {
    pub pair_id: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<i32>,
    pub source: String,
    pub recorded_at: DateTime<Utc>,
}

/// Row ready for `market_sentiment`; the asset is already resolved.
#[derive(Debug, Clone)]
pub struct SentimentInsert {
    pub asset_id: i64,
    pub score: f64,
    pub label: String,
    pub source: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStatistics {
    pub assets: i64,
    pub venues: i64,
    pub price_rows: i64,
    pub sentiment_rows: i64,
    pub dex_snapshots: i64,
}
