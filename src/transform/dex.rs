use chrono::Utc;

use crate::api::types::DexPair;
use crate::storage::models::DexSnapshotRecord;

use super::{required_text, TransformError};

/// DEX spot pair → snapshot row. Contract address, network and both symbols
/// are required; market numbers are kept only when finite.
pub fn from_dex_pair(pair: &DexPair) -> Result<DexSnapshotRecord, TransformError> {
    let contract_address = required_text(pair.contract_address.as_deref(), "contract_address")?;
    let network_slug = required_text(pair.network_slug.as_deref(), "network_slug")?;
    let base_symbol =
        required_text(pair.base_asset_symbol.as_deref(), "base_asset_symbol")?.to_uppercase();
    let quote_symbol =
        required_text(pair.quote_asset_symbol.as_deref(), "quote_asset_symbol")?.to_uppercase();

    Ok(DexSnapshotRecord {
        contract_address,
        network_slug,
        dex_slug: pair.dex_slug.clone().filter(|slug| !slug.is_empty()),
        base_symbol,
        quote_symbol,
        price_usd: pair.price.filter(|price| price.is_finite() && *price >= 0.0),
        liquidity_usd: pair
            .liquidity
            .filter(|liquidity| liquidity.is_finite() && *liquidity >= 0.0),
        volume_24h: pair
            .volume_24h
            .filter(|volume| volume.is_finite() && *volume >= 0.0),
        percent_change_24h: pair.percent_change_24h.filter(|change| change.is_finite()),
        recorded_at: Utc::now(),
    })
}
