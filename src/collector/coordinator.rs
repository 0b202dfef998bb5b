use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::api::error::ApiError;
use crate::api::types::{CmcAsset, CoinMarket};
use crate::api::{
    CmcDexClient, CoinGeckoApi, CoinGeckoClient, CoinMarketCapApi, CoinMarketCapClient, DexApi,
    RetryPolicy,
};
use crate::core::config::Config;
use crate::monitoring::metrics;
use crate::storage::models::{AssetRecord, NormalizedPrice, PriceBarInsert, SentimentInsert};
use crate::storage::repository::{MarketRepository, StorageError};
use crate::transform;

/// The only error a fetch method surfaces to the scheduler. Everything else
/// (provider outages, bad records, failed batches) is logged and absorbed
/// into the returned count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("coordinator is not initialized")]
    NotInitialized,
    #[error("coordinator is already initialized")]
    AlreadyInitialized,
}

#[derive(Default)]
struct ProviderSessions {
    coingecko: Option<Arc<dyn CoinGeckoApi>>,
    coinmarketcap: Option<Arc<dyn CoinMarketCapApi>>,
    cmc_dex: Option<Arc<dyn DexApi>>,
}

/// Owns the provider sessions for the collection cycle and exposes one
/// fetch-and-store method per data domain.
pub struct DataCoordinator {
    config: Config,
    repository: Arc<dyn MarketRepository>,
    sessions: Mutex<ProviderSessions>,
}

impl DataCoordinator {
    pub fn new(config: Config, repository: Arc<dyn MarketRepository>) -> Self {
        Self {
            config,
            repository,
            sessions: Mutex::new(ProviderSessions::default()),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_sessions(
        config: Config,
        repository: Arc<dyn MarketRepository>,
        coingecko: Option<Arc<dyn CoinGeckoApi>>,
        coinmarketcap: Option<Arc<dyn CoinMarketCapApi>>,
        cmc_dex: Option<Arc<dyn DexApi>>,
    ) -> Self {
        Self {
            config,
            repository,
            sessions: Mutex::new(ProviderSessions {
                coingecko,
                coinmarketcap,
                cmc_dex,
            }),
        }
    }

    /// Opens one session per provider. Sessions are installed as they come
    /// up, so a failure partway through leaves the already-opened ones for
    /// `cleanup()` to release.
    pub async fn initialize(&self) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        if sessions.coingecko.is_some()
            || sessions.coinmarketcap.is_some()
            || sessions.cmc_dex.is_some()
        {
            return Err(LifecycleError::AlreadyInitialized.into());
        }

        tracing::info!("🚀 Initializing provider clients...");
        let retry = self.retry_policy();
        let timeout = self.config.fetch.request_timeout;

        let coingecko =
            CoinGeckoClient::new(&self.config.providers.coingecko, retry.clone(), timeout)?;
        sessions.coingecko = Some(Arc::new(coingecko));

        let coinmarketcap =
            CoinMarketCapClient::new(&self.config.providers.coinmarketcap, retry.clone(), timeout)?;
        sessions.coinmarketcap = Some(Arc::new(coinmarketcap));

        let cmc_dex = CmcDexClient::new(&self.config.providers.cmc_dex, retry, timeout)?;
        sessions.cmc_dex = Some(Arc::new(cmc_dex));

        tracing::info!("✅ Provider clients ready");
        Ok(())
    }

    /// Closes every session that was opened. Safe to call repeatedly and
    /// after a failed `initialize()`.
    pub async fn cleanup(&self) {
        let (coingecko, coinmarketcap, cmc_dex) = {
            let mut sessions = self.sessions.lock().await;
            (
                sessions.coingecko.take(),
                sessions.coinmarketcap.take(),
                sessions.cmc_dex.take(),
            )
        };

        if coingecko.is_none() && coinmarketcap.is_none() && cmc_dex.is_none() {
            return;
        }

        tracing::info!("🛑 Closing provider clients...");
        if let Some(client) = coingecko {
            client.close().await;
        }
        if let Some(client) = coinmarketcap {
            client.close().await;
        }
        if let Some(client) = cmc_dex {
            client.close().await;
        }
        tracing::info!("✅ Provider cleanup complete");
    }

    /// Current prices from CoinGecko and CoinMarketCap, fetched concurrently,
    /// persisted as one batch of bars. A provider failing only costs its own
    /// rows.
    pub async fn fetch_and_store_prices(&self) -> Result<u64, LifecycleError> {
        let coingecko = self.coingecko_session().await?;
        let coinmarketcap = self.coinmarketcap_session().await?;

        tracing::info!("🔄 Fetching market prices...");
        let convert = self.config.fetch.vs_currency.to_uppercase();
        let (markets, quotes) = tokio::join!(
            self.fetch_coingecko_markets(&coingecko),
            self.fetch_cmc_quotes(&coinmarketcap),
        );

        let mut normalized: Vec<NormalizedPrice> = Vec::new();
        match markets {
            Ok(markets) => {
                for market in &markets {
                    match transform::price::from_coin_market(market, &convert) {
                        Ok(price) => normalized.push(price),
                        Err(err) => {
                            tracing::warn!(symbol = %market.symbol, "⚠️ Skipping market row: {}", err)
                        }
                    }
                }
            }
            Err(err) => tracing::error!("❌ CoinGecko market fetch failed: {}", err),
        }
        match quotes {
            Ok(assets) => {
                for asset in &assets {
                    match transform::price::from_cmc_asset(asset, &convert) {
                        Ok(price) => normalized.push(price),
                        Err(err) => {
                            tracing::warn!(symbol = %asset.symbol, "⚠️ Skipping quote row: {}", err)
                        }
                    }
                }
            }
            Err(err) => tracing::error!("❌ CoinMarketCap quote fetch failed: {}", err),
        }

        let mut batch = Vec::with_capacity(normalized.len());
        for price in &normalized {
            match self.resolve_price_parents(price).await {
                Ok(pair_id) => batch.push(PriceBarInsert {
                    pair_id,
                    open: price.open,
                    high: price.high,
                    low: price.low,
                    close: price.close,
                    volume: price.volume,
                    market_cap: price.market_cap,
                    market_cap_rank: price.market_cap_rank,
                    source: price.source.clone(),
                    recorded_at: price.recorded_at,
                }),
                Err(err) => {
                    tracing::warn!(symbol = %price.symbol, "⚠️ Skipping price row: {}", err)
                }
            }
        }

        if batch.is_empty() {
            tracing::warn!("⚠️ No price records this cycle");
            return Ok(0);
        }
        let inserted = match self.repository.insert_price_bars(&batch).await {
            Ok(count) => count,
            Err(err) => {
                tracing::error!("❌ Price batch insert failed: {}", err);
                0
            }
        };
        if inserted > 0 {
            metrics::record_records_inserted("prices", inserted);
            tracing::info!(count = inserted, "✅ Price records stored");
        }
        Ok(inserted)
    }

    /// Coin catalog from CoinGecko, bounded by `batch_size`, upserted as one
    /// transaction.
    pub async fn fetch_and_store_metadata(&self) -> Result<u64, LifecycleError> {
        let coingecko = self.coingecko_session().await?;

        tracing::info!("🔄 Fetching coin metadata...");
        let coins = match coingecko.coin_list().await {
            Ok(coins) => coins,
            Err(err) => {
                tracing::error!("❌ Coin list fetch failed: {}", err);
                return Ok(0);
            }
        };

        let mut assets = Vec::new();
        for entry in coins.iter().take(self.config.fetch.batch_size as usize) {
            match transform::metadata::asset_from_list_entry(entry) {
                Ok(asset) => assets.push(asset),
                Err(err) => tracing::warn!(coin = %entry.id, "⚠️ Skipping coin entry: {}", err),
            }
        }
        if assets.is_empty() {
            return Ok(0);
        }

        let written = match self.repository.upsert_assets(&assets).await {
            Ok(count) => count,
            Err(err) => {
                tracing::error!("❌ Asset batch upsert failed: {}", err);
                0
            }
        };
        if written > 0 {
            metrics::record_records_inserted("metadata", written);
            tracing::info!(count = written, "✅ Asset metadata stored");
        }
        Ok(written)
    }

    /// Trending list from CoinGecko turned into sentiment rows; each row's
    /// asset is resolved with an upsert first.
    pub async fn fetch_and_store_sentiment(&self) -> Result<u64, LifecycleError> {
        let coingecko = self.coingecko_session().await?;

        tracing::info!("🔄 Fetching market sentiment...");
        let trending = match coingecko.trending().await {
            Ok(trending) => trending,
            Err(err) => {
                tracing::error!("❌ Trending fetch failed: {}", err);
                return Ok(0);
            }
        };

        let mut rows: Vec<SentimentInsert> = Vec::new();
        for coin in &trending.coins {
            let record = match transform::sentiment::from_trending_item(&coin.item) {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(coin = %coin.item.id, "⚠️ Skipping trending entry: {}", err);
                    continue;
                }
            };
            let asset = AssetRecord {
                symbol: record.symbol.clone(),
                name: record.name.clone(),
                slug: None,
            };
            match self.repository.upsert_asset(&asset).await {
                Ok(asset_id) => rows.push(SentimentInsert {
                    asset_id,
                    score: record.score,
                    label: record.label,
                    source: record.source,
                    recorded_at: record.recorded_at,
                }),
                Err(err) => {
                    tracing::warn!(symbol = %record.symbol, "⚠️ Skipping sentiment row: {}", err)
                }
            }
        }

        if rows.is_empty() {
            return Ok(0);
        }
        let inserted = match self.repository.insert_sentiment(&rows).await {
            Ok(count) => count,
            Err(err) => {
                tracing::error!("❌ Sentiment batch insert failed: {}", err);
                0
            }
        };
        if inserted > 0 {
            metrics::record_records_inserted("sentiment", inserted);
            tracing::info!(count = inserted, "✅ Sentiment records stored");
        }
        Ok(inserted)
    }

    /// DEX spot-pair snapshots from CoinMarketCap, persisted as one batch.
    pub async fn fetch_and_store_dex_pairs(&self) -> Result<u64, LifecycleError> {
        let cmc_dex = self.dex_session().await?;

        tracing::info!("🔄 Fetching DEX pairs...");
        let response = match cmc_dex.spot_pairs_latest(self.config.fetch.batch_size).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("❌ DEX pair fetch failed: {}", err);
                return Ok(0);
            }
        };

        let mut snapshots = Vec::new();
        for pair in &response.data {
            match transform::dex::from_dex_pair(pair) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => tracing::warn!("⚠️ Skipping DEX pair: {}", err),
            }
        }
        if snapshots.is_empty() {
            return Ok(0);
        }

        let inserted = match self.repository.insert_dex_snapshots(&snapshots).await {
            Ok(count) => count,
            Err(err) => {
                tracing::error!("❌ DEX snapshot insert failed: {}", err);
                0
            }
        };
        if inserted > 0 {
            metrics::record_records_inserted("dex_pairs", inserted);
            tracing::info!(count = inserted, "✅ DEX snapshots stored");
        }
        Ok(inserted)
    }

    /// Exchange directory from CoinGecko upserted into venues.
    pub async fn fetch_and_store_venues(&self) -> Result<u64, LifecycleError> {
        let coingecko = self.coingecko_session().await?;

        tracing::info!("🔄 Fetching trading venues...");
        let exchanges = match coingecko.exchanges(self.config.fetch.batch_size, 1).await {
            Ok(exchanges) => exchanges,
            Err(err) => {
                tracing::error!("❌ Exchange fetch failed: {}", err);
                return Ok(0);
            }
        };

        let mut venues = Vec::new();
        for exchange in &exchanges {
            match transform::metadata::venue_from_exchange(exchange) {
                Ok(venue) => venues.push(venue),
                Err(err) => tracing::warn!(exchange = %exchange.id, "⚠️ Skipping exchange: {}", err),
            }
        }
        if venues.is_empty() {
            return Ok(0);
        }

        let written = match self.repository.upsert_venues(&venues).await {
            Ok(count) => count,
            Err(err) => {
                tracing::error!("❌ Venue batch upsert failed: {}", err);
                0
            }
        };
        if written > 0 {
            metrics::record_records_inserted("venues", written);
            tracing::info!(count = written, "✅ Venue records stored");
        }
        Ok(written)
    }

    async fn fetch_coingecko_markets(
        &self,
        client: &Arc<dyn CoinGeckoApi>,
    ) -> Result<Vec<CoinMarket>, ApiError> {
        let per_page = self.config.fetch.batch_size;
        let mut all = Vec::new();
        for page in 1..=self.config.fetch.price_pages.max(1) {
            let markets = client
                .coin_markets(&self.config.fetch.vs_currency, per_page, page)
                .await?;
            let fetched = markets.len();
            all.extend(markets);
            if fetched < per_page as usize {
                break;
            }
        }
        Ok(all)
    }

    async fn fetch_cmc_quotes(
        &self,
        client: &Arc<dyn CoinMarketCapApi>,
    ) -> Result<Vec<CmcAsset>, ApiError> {
        if self.config.fetch.quote_symbols.is_empty() {
            return Ok(Vec::new());
        }
        let convert = self.config.fetch.vs_currency.to_uppercase();
        let response = client
            .quotes_latest(&self.config.fetch.quote_symbols, &convert)
            .await?;
        Ok(response.data.into_values().collect())
    }

    async fn resolve_price_parents(&self, price: &NormalizedPrice) -> Result<i64, StorageError> {
        let asset_id = self
            .repository
            .upsert_asset(&AssetRecord {
                symbol: price.symbol.clone(),
                name: price.name.clone(),
                slug: None,
            })
            .await?;
        self.repository
            .upsert_trading_pair(asset_id, &price.symbol, &price.quote_symbol, None)
            .await
    }

    async fn coingecko_session(&self) -> Result<Arc<dyn CoinGeckoApi>, LifecycleError> {
        self.sessions
            .lock()
            .await
            .coingecko
            .clone()
            .ok_or(LifecycleError::NotInitialized)
    }

    async fn coinmarketcap_session(&self) -> Result<Arc<dyn CoinMarketCapApi>, LifecycleError> {
        self.sessions
            .lock()
            .await
            .coinmarketcap
            .clone()
            .ok_or(LifecycleError::NotInitialized)
    }

    async fn dex_session(&self) -> Result<Arc<dyn DexApi>, LifecycleError> {
        self.sessions
            .lock()
            .await
            .cmc_dex
            .clone()
            .ok_or(LifecycleError::NotInitialized)
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.config.fetch.max_attempts,
            base_delay: self.config.fetch.retry_base_delay,
            multiplier: self.config.fetch.retry_multiplier,
            max_delay: self.config.fetch.retry_max_delay,
            jitter: self.config.fetch.retry_jitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::coingecko::MockCoinGeckoApi;
    use crate::api::coinmarketcap::{MockCoinMarketCapApi, MockDexApi};
    use crate::api::types::{
        CmcQuote, CmcQuoteResponse, CoinListEntry, DexPair, DexPairsResponse, ExchangeInfo,
        TrendingCoin, TrendingItem, TrendingResponse,
    };
    use crate::storage::repository::MockMarketRepository;
    use std::collections::HashMap;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.fetch.quote_symbols = vec!["SOL".to_string(), "ADA".to_string()];
        config.fetch.price_pages = 1;
        config
    }

    fn market(symbol: &str, price: Option<f64>) -> CoinMarket {
        CoinMarket {
            id: symbol.to_lowercase(),
            symbol: symbol.to_string(),
            name: format!("{symbol} Coin"),
            current_price: price,
            market_cap: Some(1_000.0),
            market_cap_rank: Some(1),
            total_volume: Some(10.0),
            high_24h: None,
            low_24h: None,
            price_change_24h: None,
            price_change_percentage_24h: None,
            last_updated: None,
        }
    }

    fn cmc_quotes(symbols: &[&str]) -> CmcQuoteResponse {
        let mut data = HashMap::new();
        for (index, symbol) in symbols.iter().enumerate() {
            let mut quote = HashMap::new();
            quote.insert(
                "USD".to_string(),
                CmcQuote {
                    price: Some(10.0 + index as f64),
                    volume_24h: Some(100.0),
                    percent_change_24h: Some(1.0),
                    market_cap: Some(5_000.0),
                    last_updated: None,
                },
            );
            data.insert(
                symbol.to_string(),
                CmcAsset {
                    id: index as i64 + 1,
                    name: format!("{symbol} Coin"),
                    symbol: symbol.to_string(),
                    cmc_rank: Some(index as i64 + 1),
                    quote,
                },
            );
        }
        CmcQuoteResponse { data }
    }

    fn trending_coin(symbol: &str, position: i64) -> TrendingCoin {
        TrendingCoin {
            item: TrendingItem {
                id: symbol.to_lowercase(),
                symbol: symbol.to_string(),
                name: format!("{symbol} Coin"),
                market_cap_rank: Some(position + 1),
                score: Some(position),
            },
        }
    }

    fn dex_pair(address: Option<&str>) -> DexPair {
        DexPair {
            name: Some("X/Y".to_string()),
            base_asset_symbol: Some("X".to_string()),
            quote_asset_symbol: Some("Y".to_string()),
            contract_address: address.map(str::to_string),
            network_slug: Some("ethereum".to_string()),
            dex_slug: Some("uniswap-v3".to_string()),
            price: Some(1.0),
            volume_24h: Some(2.0),
            liquidity: Some(3.0),
            percent_change_24h: Some(0.5),
            num_transactions_24h: Some(4),
        }
    }

    fn exchange(name: &str) -> ExchangeInfo {
        ExchangeInfo {
            id: name.to_lowercase(),
            name: name.to_string(),
            year_established: Some(2017),
            country: None,
            url: None,
            trust_score: Some(9),
            trade_volume_24h_btc: Some(1_000.0),
        }
    }

    fn coordinator_with(
        repo: MockMarketRepository,
        coingecko: MockCoinGeckoApi,
        coinmarketcap: MockCoinMarketCapApi,
        cmc_dex: MockDexApi,
    ) -> DataCoordinator {
        DataCoordinator::with_sessions(
            test_config(),
            Arc::new(repo),
            Some(Arc::new(coingecko)),
            Some(Arc::new(coinmarketcap)),
            Some(Arc::new(cmc_dex)),
        )
    }

    #[tokio::test]
    async fn prices_from_both_providers_land_in_one_batch() {
        let mut coingecko = MockCoinGeckoApi::new();
        coingecko.expect_coin_markets().times(1).returning(|_, _, _| {
            Ok(vec![
                market("btc", Some(100.0)),
                market("eth", Some(50.0)),
                market("bad", None),
            ])
        });
        let mut coinmarketcap = MockCoinMarketCapApi::new();
        coinmarketcap
            .expect_quotes_latest()
            .times(1)
            .returning(|_, _| Ok(cmc_quotes(&["SOL", "ADA"])));

        let mut repo = MockMarketRepository::new();
        repo.expect_upsert_asset().times(4).returning(|_| Ok(1));
        repo.expect_upsert_trading_pair()
            .times(4)
            .returning(|_, _, _, _| Ok(10));
        repo.expect_insert_price_bars()
            .withf(|batch| batch.len() == 4)
            .times(1)
            .returning(|batch| Ok(batch.len() as u64));

        let coordinator = coordinator_with(repo, coingecko, coinmarketcap, MockDexApi::new());
        assert_eq!(coordinator.fetch_and_store_prices().await, Ok(4));
    }

    #[tokio::test]
    async fn one_provider_failing_still_persists_the_other() {
        let mut coingecko = MockCoinGeckoApi::new();
        coingecko.expect_coin_markets().returning(|_, _, _| {
            Err(ApiError::Timeout {
                provider: "coingecko",
            })
        });
        let mut coinmarketcap = MockCoinMarketCapApi::new();
        coinmarketcap
            .expect_quotes_latest()
            .returning(|_, _| Ok(cmc_quotes(&["SOL"])));

        let mut repo = MockMarketRepository::new();
        repo.expect_upsert_asset().returning(|_| Ok(1));
        repo.expect_upsert_trading_pair().returning(|_, _, _, _| Ok(2));
        repo.expect_insert_price_bars()
            .withf(|batch| batch.len() == 1)
            .returning(|batch| Ok(batch.len() as u64));

        let coordinator = coordinator_with(repo, coingecko, coinmarketcap, MockDexApi::new());
        assert_eq!(coordinator.fetch_and_store_prices().await, Ok(1));
    }

    #[tokio::test]
    async fn failed_batch_insert_reports_zero_without_erroring() {
        let mut coingecko = MockCoinGeckoApi::new();
        coingecko
            .expect_coin_markets()
            .returning(|_, _, _| Ok(vec![market("btc", Some(1.0))]));
        let mut coinmarketcap = MockCoinMarketCapApi::new();
        coinmarketcap
            .expect_quotes_latest()
            .returning(|_, _| Ok(cmc_quotes(&[])));

        let mut repo = MockMarketRepository::new();
        repo.expect_upsert_asset().returning(|_| Ok(1));
        repo.expect_upsert_trading_pair().returning(|_, _, _, _| Ok(2));
        repo.expect_insert_price_bars()
            .returning(|_| Err(StorageError::Database(sqlx::Error::PoolTimedOut)));

        let coordinator = coordinator_with(repo, coingecko, coinmarketcap, MockDexApi::new());
        assert_eq!(coordinator.fetch_and_store_prices().await, Ok(0));
    }

    #[tokio::test]
    async fn fetching_before_initialization_is_a_lifecycle_error() {
        let coordinator = DataCoordinator::with_sessions(
            test_config(),
            Arc::new(MockMarketRepository::new()),
            None,
            None,
            None,
        );

        assert_eq!(
            coordinator.fetch_and_store_prices().await,
            Err(LifecycleError::NotInitialized)
        );
        assert_eq!(
            coordinator.fetch_and_store_dex_pairs().await,
            Err(LifecycleError::NotInitialized)
        );
    }

    #[tokio::test]
    async fn double_initialization_is_rejected() {
        let coordinator =
            DataCoordinator::new(test_config(), Arc::new(MockMarketRepository::new()));
        coordinator.initialize().await.expect("first initialize");

        let err = coordinator.initialize().await.expect_err("expected failure");
        assert_eq!(
            err.downcast::<LifecycleError>().ok(),
            Some(LifecycleError::AlreadyInitialized)
        );
        coordinator.cleanup().await;
    }

    #[tokio::test]
    async fn cleanup_closes_each_session_exactly_once() {
        let mut coingecko = MockCoinGeckoApi::new();
        coingecko.expect_close().times(1).returning(|| ());
        let mut coinmarketcap = MockCoinMarketCapApi::new();
        coinmarketcap.expect_close().times(1).returning(|| ());
        let mut cmc_dex = MockDexApi::new();
        cmc_dex.expect_close().times(1).returning(|| ());

        let coordinator =
            coordinator_with(MockMarketRepository::new(), coingecko, coinmarketcap, cmc_dex);
        coordinator.cleanup().await;
        coordinator.cleanup().await;
    }

    #[tokio::test]
    async fn cleanup_after_partial_initialization_closes_what_opened() {
        let mut coingecko = MockCoinGeckoApi::new();
        coingecko.expect_close().times(1).returning(|| ());

        let coordinator = DataCoordinator::with_sessions(
            test_config(),
            Arc::new(MockMarketRepository::new()),
            Some(Arc::new(coingecko)),
            None,
            None,
        );
        coordinator.cleanup().await;

        // Sessions are gone afterwards.
        assert_eq!(
            coordinator.fetch_and_store_metadata().await,
            Err(LifecycleError::NotInitialized)
        );
    }

    #[tokio::test]
    async fn metadata_is_bounded_by_batch_size() {
        let mut coingecko = MockCoinGeckoApi::new();
        coingecko.expect_coin_list().returning(|| {
            Ok((0..8)
                .map(|index| CoinListEntry {
                    id: format!("coin-{index}"),
                    symbol: format!("C{index}"),
                    name: format!("Coin {index}"),
                })
                .collect())
        });

        let mut repo = MockMarketRepository::new();
        repo.expect_upsert_assets()
            .withf(|assets| assets.len() == 5)
            .times(1)
            .returning(|assets| Ok(assets.len() as u64));

        let mut config = test_config();
        config.fetch.batch_size = 5;
        let coordinator = DataCoordinator::with_sessions(
            config,
            Arc::new(repo),
            Some(Arc::new(coingecko)),
            None,
            None,
        );
        assert_eq!(coordinator.fetch_and_store_metadata().await, Ok(5));
    }

    #[tokio::test]
    async fn sentiment_rows_skip_unresolvable_assets() {
        let mut coingecko = MockCoinGeckoApi::new();
        coingecko.expect_trending().returning(|| {
            Ok(TrendingResponse {
                coins: vec![
                    trending_coin("btc", 0),
                    trending_coin("eth", 1),
                    trending_coin("broken", 2),
                ],
            })
        });

        let mut repo = MockMarketRepository::new();
        repo.expect_upsert_asset().returning(|asset| {
            if asset.symbol == "BROKEN" {
                Err(StorageError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(7)
            }
        });
        repo.expect_insert_sentiment()
            .withf(|rows| rows.len() == 2)
            .times(1)
            .returning(|rows| Ok(rows.len() as u64));

        let coordinator = coordinator_with(
            repo,
            coingecko,
            MockCoinMarketCapApi::new(),
            MockDexApi::new(),
        );
        assert_eq!(coordinator.fetch_and_store_sentiment().await, Ok(2));
    }

    #[tokio::test]
    async fn malformed_dex_pairs_are_skipped_not_fatal() {
        let mut cmc_dex = MockDexApi::new();
        cmc_dex.expect_spot_pairs_latest().returning(|_| {
            Ok(DexPairsResponse {
                data: vec![dex_pair(Some("0x1")), dex_pair(Some("0x2")), dex_pair(None)],
            })
        });

        let mut repo = MockMarketRepository::new();
        repo.expect_insert_dex_snapshots()
            .withf(|rows| rows.len() == 2)
            .times(1)
            .returning(|rows| Ok(rows.len() as u64));

        let coordinator = coordinator_with(
            repo,
            MockCoinGeckoApi::new(),
            MockCoinMarketCapApi::new(),
            cmc_dex,
        );
        assert_eq!(coordinator.fetch_and_store_dex_pairs().await, Ok(2));
    }

    #[tokio::test]
    async fn venues_upsert_skips_nameless_exchanges() {
        let mut coingecko = MockCoinGeckoApi::new();
        coingecko
            .expect_exchanges()
            .returning(|_, _| Ok(vec![exchange("Binance"), exchange("  ")]));

        let mut repo = MockMarketRepository::new();
        repo.expect_upsert_venues()
            .withf(|venues| venues.len() == 1 && venues[0].name == "Binance")
            .times(1)
            .returning(|venues| Ok(venues.len() as u64));

        let coordinator = coordinator_with(
            repo,
            coingecko,
            MockCoinMarketCapApi::new(),
            MockDexApi::new(),
        );
        assert_eq!(coordinator.fetch_and_store_venues().await, Ok(1));
    }
}
