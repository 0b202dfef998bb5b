pub mod database;
pub mod models;
pub mod repository;

pub use database::{connect_pool, initialize_schema};
pub use models::{
    AssetRecord, DexSnapshotRecord, NormalizedPrice, PriceBarInsert, SentimentInsert,
    SentimentRecord, StorageStatistics, VenueRecord,
};
pub use repository::{MarketRepository, PgMarketRepository, StorageError, StorageResult};

#[cfg(test)]
pub use repository::MockMarketRepository;
