use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{
    AssetRecord, DexSnapshotRecord, PriceBarInsert, SentimentInsert, StorageStatistics,
    VenueRecord,
};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("constraint violation on {entity} ({key}): {detail}")]
    Constraint {
        entity: &'static str,
        key: String,
        detail: String,
    },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Unique/foreign-key violations (SQLSTATE 23505/23503) carry the natural
    /// key that collided; anything else stays a plain database error.
    fn from_sqlx(entity: &'static str, key: &str, err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if matches!(db_err.code().as_deref(), Some("23505") | Some("23503")) {
                return StorageError::Constraint {
                    entity,
                    key: key.to_string(),
                    detail: db_err.message().to_string(),
                };
            }
        }
        StorageError::Database(err)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketRepository: Send + Sync {
    /// Idempotent upsert keyed by symbol, returns the asset id.
    async fn upsert_asset(&self, asset: &AssetRecord) -> StorageResult<i64>;

    /// Upserts the whole slice in one transaction, returns rows written.
    async fn upsert_assets(&self, assets: &[AssetRecord]) -> StorageResult<u64>;

    /// Upserts the whole slice in one transaction, returns rows written.
    async fn upsert_venues(&self, venues: &[VenueRecord]) -> StorageResult<u64>;

    /// Idempotent upsert keyed by `(asset_id, base, quote)`, returns the pair id.
    async fn upsert_trading_pair(
        &self,
        asset_id: i64,
        base_symbol: &str,
        quote_symbol: &str,
        venue_id: Option<i64>,
    ) -> StorageResult<i64>;

    async fn insert_price_bars(&self, bars: &[PriceBarInsert]) -> StorageResult<u64>;

    async fn insert_sentiment(&self, rows: &[SentimentInsert]) -> StorageResult<u64>;

    async fn insert_dex_snapshots(&self, rows: &[DexSnapshotRecord]) -> StorageResult<u64>;

    async fn statistics(&self) -> StorageResult<StorageStatistics>;
}

pub struct PgMarketRepository {
    pool: PgPool,
}

impl PgMarketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketRepository for PgMarketRepository {
    async fn upsert_asset(&self, asset: &AssetRecord) -> StorageResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO assets (symbol, name, slug, last_updated)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (symbol) DO UPDATE SET
                name = excluded.name,
                slug = COALESCE(excluded.slug, assets.slug),
                last_updated = NOW()
            RETURNING id
            "#,
        )
        .bind(&asset.symbol)
        .bind(&asset.name)
        .bind(&asset.slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| StorageError::from_sqlx("asset", &asset.symbol, err))?;

        Ok(id)
    }

    async fn upsert_assets(&self, assets: &[AssetRecord]) -> StorageResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for asset in assets {
            let result = sqlx::query(
                r#"
                INSERT INTO assets (symbol, name, slug, last_updated)
                VALUES ($1, $2, $3, NOW())
                ON CONFLICT (symbol) DO UPDATE SET
                    name = excluded.name,
                    slug = COALESCE(excluded.slug, assets.slug),
                    last_updated = NOW()
                "#,
            )
            .bind(&asset.symbol)
            .bind(&asset.name)
            .bind(&asset.slug)
            .execute(&mut *tx)
            .await
            .map_err(|err| StorageError::from_sqlx("asset", &asset.symbol, err))?;

            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn upsert_venues(&self, venues: &[VenueRecord]) -> StorageResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for venue in venues {
            let result = sqlx::query(
                r#"
                INSERT INTO venues (
                    name, country, url, trust_score, trade_volume_24h_btc,
                    year_established, last_updated
                )
                VALUES ($1, $2, $3, $4, $5, $6, NOW())
                ON CONFLICT (name) DO UPDATE SET
                    country = excluded.country,
                    url = excluded.url,
                    trust_score = excluded.trust_score,
                    trade_volume_24h_btc = excluded.trade_volume_24h_btc,
                    year_established = excluded.year_established,
                    last_updated = NOW()
                "#,
            )
            .bind(&venue.name)
            .bind(&venue.country)
            .bind(&venue.url)
            .bind(venue.trust_score)
            .bind(venue.trade_volume_24h_btc)
            .bind(venue.year_established)
            .execute(&mut *tx)
            .await
            .map_err(|err| StorageError::from_sqlx("venue", &venue.name, err))?;

            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn upsert_trading_pair(
        &self,
        asset_id: i64,
        base_symbol: &str,
        quote_symbol: &str,
        venue_id: Option<i64>,
    ) -> StorageResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO trading_pairs (asset_id, venue_id, base_symbol, quote_symbol)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (asset_id, base_symbol, quote_symbol) DO UPDATE SET
                venue_id = COALESCE(excluded.venue_id, trading_pairs.venue_id)
            RETURNING id
            "#,
        )
        .bind(asset_id)
        .bind(venue_id)
        .bind(base_symbol)
        .bind(quote_symbol)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            StorageError::from_sqlx("trading_pair", &format!("{base_symbol}/{quote_symbol}"), err)
        })?;

        Ok(id)
    }

    async fn insert_price_bars(&self, bars: &[PriceBarInsert]) -> StorageResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for bar in bars {
            let result = sqlx::query(
                r#"
                INSERT INTO price_history (
                    pair_id, open, high, low, close, volume,
                    market_cap, market_cap_rank, source, recorded_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(bar.pair_id)
            .bind(bar.open)
            .bind(bar.high)
            .bind(bar.low)
            .bind(bar.close)
            .bind(bar.volume)
            .bind(bar.market_cap)
            .bind(bar.market_cap_rank)
            .bind(&bar.source)
            .bind(bar.recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                StorageError::from_sqlx("price_bar", &bar.pair_id.to_string(), err)
            })?;

            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn insert_sentiment(&self, rows: &[SentimentInsert]) -> StorageResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for row in rows {
            let result = sqlx::query(
                r#"
                INSERT INTO market_sentiment (asset_id, score, label, source, recorded_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(row.asset_id)
            .bind(row.score)
            .bind(&row.label)
            .bind(&row.source)
            .bind(row.recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                StorageError::from_sqlx("sentiment", &row.asset_id.to_string(), err)
            })?;

            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn insert_dex_snapshots(&self, rows: &[DexSnapshotRecord]) -> StorageResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for row in rows {
            let result = sqlx::query(
                r#"
                INSERT INTO dex_pair_snapshots (
                    contract_address, network_slug, dex_slug, base_symbol, quote_symbol,
                    price_usd, liquidity_usd, volume_24h, percent_change_24h, recorded_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&row.contract_address)
            .bind(&row.network_slug)
            .bind(&row.dex_slug)
            .bind(&row.base_symbol)
            .bind(&row.quote_symbol)
            .bind(row.price_usd)
            .bind(row.liquidity_usd)
            .bind(row.volume_24h)
            .bind(row.percent_change_24h)
            .bind(row.recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                StorageError::from_sqlx("dex_snapshot", &row.contract_address, err)
            })?;

            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn statistics(&self) -> StorageResult<StorageStatistics> {
        #[derive(sqlx::FromRow)]
        struct Counts {
            assets: i64,
            venues: i64,
            price_rows: i64,
            sentiment_rows: i64,
            dex_snapshots: i64,
        }

        let counts = sqlx::query_as::<_, Counts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM assets) AS assets,
                (SELECT COUNT(*) FROM venues) AS venues,
                (SELECT COUNT(*) FROM price_history) AS price_rows,
                (SELECT COUNT(*) FROM market_sentiment) AS sentiment_rows,
                (SELECT COUNT(*) FROM dex_pair_snapshots) AS dex_snapshots
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StorageStatistics {
            assets: counts.assets,
            venues: counts.venues,
            price_rows: counts.price_rows,
            sentiment_rows: counts.sentiment_rows,
            dex_snapshots: counts.dex_snapshots,
        })
    }
}
