use anyhow::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::core::config::DatabaseConfig;

pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(config.connect_timeout)
        .connect(&config.postgres_url)
        .await?;

    Ok(pool)
}

pub async fn initialize_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assets (
            id BIGSERIAL PRIMARY KEY,
            symbol TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            slug TEXT,
            first_seen TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS venues (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            country TEXT,
            url TEXT,
            trust_score DOUBLE PRECISION,
            trade_volume_24h_btc DOUBLE PRECISION,
            year_established INTEGER,
            last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trading_pairs (
            id BIGSERIAL PRIMARY KEY,
            asset_id BIGINT NOT NULL REFERENCES assets(id),
            venue_id BIGINT REFERENCES venues(id),
            base_symbol TEXT NOT NULL,
            quote_symbol TEXT NOT NULL,
            UNIQUE (asset_id, base_symbol, quote_symbol)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS price_history (
            id BIGSERIAL PRIMARY KEY,
            pair_id BIGINT NOT NULL REFERENCES trading_pairs(id),
            open DOUBLE PRECISION NOT NULL,
            high DOUBLE PRECISION NOT NULL,
            low DOUBLE PRECISION NOT NULL,
            close DOUBLE PRECISION NOT NULL,
            volume DOUBLE PRECISION NOT NULL,
            market_cap DOUBLE PRECISION,
            market_cap_rank INTEGER,
            source TEXT NOT NULL,
            recorded_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS market_sentiment (
            id BIGSERIAL PRIMARY KEY,
            asset_id BIGINT NOT NULL REFERENCES assets(id),
            score DOUBLE PRECISION NOT NULL,
            label TEXT NOT NULL,
            source TEXT NOT NULL,
            recorded_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dex_pair_snapshots (
            id BIGSERIAL PRIMARY KEY,
            contract_address TEXT NOT NULL,
            network_slug TEXT NOT NULL,
            dex_slug TEXT,
            base_symbol TEXT NOT NULL,
            quote_symbol TEXT NOT NULL,
            price_usd DOUBLE PRECISION,
            liquidity_usd DOUBLE PRECISION,
            volume_24h DOUBLE PRECISION,
            percent_change_24h DOUBLE PRECISION,
            recorded_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_price_history_pair_time
        ON price_history (pair_id, recorded_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_market_sentiment_asset_time
        ON market_sentiment (asset_id, recorded_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("✅ Market database schema initialized");

    Ok(())
}
