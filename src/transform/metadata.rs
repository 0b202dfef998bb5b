use crate::api::types::{CoinListEntry, ExchangeInfo};
use crate::storage::models::{AssetRecord, VenueRecord};

use super::{required_symbol, TransformError};

/// Coin-list entry → asset upsert payload. The CoinGecko id doubles as the
/// slug; a blank name falls back to the symbol.
pub fn asset_from_list_entry(entry: &CoinListEntry) -> Result<AssetRecord, TransformError> {
    let symbol = required_symbol(&entry.symbol)?;
    let name = match entry.name.trim() {
        "" => symbol.clone(),
        name => name.to_string(),
    };

    Ok(AssetRecord {
        symbol,
        name,
        slug: Some(entry.id.clone()).filter(|id| !id.is_empty()),
    })
}

/// Exchange entry → venue upsert payload, keyed by venue name.
pub fn venue_from_exchange(exchange: &ExchangeInfo) -> Result<VenueRecord, TransformError> {
    let name = exchange.name.trim();
    if name.is_empty() {
        return Err(TransformError::MissingField("name"));
    }

    Ok(VenueRecord {
        name: name.to_string(),
        country: exchange.country.clone().filter(|country| !country.is_empty()),
        url: exchange.url.clone().filter(|url| !url.is_empty()),
        trust_score: exchange.trust_score.map(f64::from),
        trade_volume_24h_btc: exchange
            .trade_volume_24h_btc
            .filter(|volume| volume.is_finite() && *volume >= 0.0),
        year_established: exchange.year_established,
    })
}
