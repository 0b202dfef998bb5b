use chrono::Utc;

use crate::api::coingecko;
use crate::api::types::TrendingItem;
use crate::storage::models::SentimentRecord;

use super::{required_symbol, TransformError};

/// Trending position → sentiment. The list leader scores 1.0 and each step
/// down costs 0.1; an item without a position is treated as mid-list.
pub fn from_trending_item(item: &TrendingItem) -> Result<SentimentRecord, TransformError> {
    let symbol = required_symbol(&item.symbol)?;
    let position = item.score.unwrap_or(5).clamp(0, 10);
    let score = (100 - 10 * position) as f64 / 100.0;

    Ok(SentimentRecord {
        symbol,
        name: item.name.clone(),
        score,
        label: label_for(score).to_string(),
        source: coingecko::PROVIDER.to_string(),
        recorded_at: Utc::now(),
    })
}

pub fn label_for(score: f64) -> &'static str {
    if score >= 0.65 {
        "positive"
    } else if score <= 0.35 {
        "negative"
    } else {
        "neutral"
    }
}
