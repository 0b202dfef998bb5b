use chrono::Utc;

use crate::api::coingecko;
use crate::api::coinmarketcap;
use crate::api::types::{CmcAsset, CoinMarket};
use crate::storage::models::NormalizedPrice;

use super::{finite_non_negative, required_symbol, TransformError};

/// CoinGecko `/coins/markets` entry → one normalized bar.
///
/// Close is the live price. High/low come from the 24 h extremes when present,
/// open is reconstructed from the 24 h change and floored at zero; the bar is
/// widened so high/low always bracket open and close.
pub fn from_coin_market(
    market: &CoinMarket,
    quote_symbol: &str,
) -> Result<NormalizedPrice, TransformError> {
    let symbol = required_symbol(&market.symbol)?;
    let close = market
        .current_price
        .ok_or(TransformError::MissingField("current_price"))?;
    let close = finite_non_negative(close, "current_price")?;

    let open = market
        .price_change_24h
        .filter(|change| change.is_finite())
        .map(|change| (close - change).max(0.0))
        .unwrap_or(close);
    let high = market
        .high_24h
        .filter(|value| value.is_finite())
        .unwrap_or(close)
        .max(open)
        .max(close);
    let low = market
        .low_24h
        .filter(|value| value.is_finite())
        .unwrap_or(close)
        .min(open)
        .min(close);
    let volume = match market.total_volume {
        Some(value) => finite_non_negative(value, "total_volume")?,
        None => 0.0,
    };

    Ok(NormalizedPrice {
        symbol,
        name: market.name.clone(),
        quote_symbol: quote_symbol.to_uppercase(),
        open,
        high,
        low,
        close,
        volume,
        market_cap: market.market_cap.filter(|cap| cap.is_finite()),
        market_cap_rank: rank_i32(market.market_cap_rank),
        source: coingecko::PROVIDER.to_string(),
        recorded_at: Utc::now(),
    })
}

/// CoinMarketCap quote → one normalized bar; the quote block for `convert`
/// must be present. Open is backed out of the 24 h percent change.
pub fn from_cmc_asset(asset: &CmcAsset, convert: &str) -> Result<NormalizedPrice, TransformError> {
    let symbol = required_symbol(&asset.symbol)?;
    let quote = asset
        .quote
        .get(convert)
        .ok_or(TransformError::MissingField("quote"))?;
    let close = quote.price.ok_or(TransformError::MissingField("price"))?;
    let close = finite_non_negative(close, "price")?;

    let open = quote
        .percent_change_24h
        .filter(|pct| pct.is_finite())
        .map(|pct| {
            let denominator = 1.0 + pct / 100.0;
            if denominator > 0.0 {
                close / denominator
            } else {
                close
            }
        })
        .unwrap_or(close);
    let volume = match quote.volume_24h {
        Some(value) => finite_non_negative(value, "volume_24h")?,
        None => 0.0,
    };

    Ok(NormalizedPrice {
        symbol,
        name: asset.name.clone(),
        quote_symbol: convert.to_uppercase(),
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        volume,
        market_cap: quote.market_cap.filter(|cap| cap.is_finite()),
        market_cap_rank: rank_i32(asset.cmc_rank),
        source: coinmarketcap::CMC_PROVIDER.to_string(),
        recorded_at: Utc::now(),
    })
}

fn rank_i32(rank: Option<i64>) -> Option<i32> {
    rank.and_then(|value| i32::try_from(value).ok())
}
