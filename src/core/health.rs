use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub database: bool,
    pub coingecko: bool,
    pub coinmarketcap: bool,
    pub cmc_dex: bool,
    pub scheduler: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, bool>,
}

impl ComponentHealth {
    pub fn get(&self, key: &str) -> Option<bool> {
        match key {
            "database" => Some(self.database),
            "coingecko" => Some(self.coingecko),
            "coinmarketcap" => Some(self.coinmarketcap),
            "cmc_dex" => Some(self.cmc_dex),
            "scheduler" => Some(self.scheduler),
            _ => self.extra.get(key).copied(),
        }
    }

    /// Rollup: the database and the scheduler are hard dependencies, a
    /// single dead provider only degrades the service.
    fn overall(&self) -> &'static str {
        if !self.database || !self.scheduler {
            "unhealthy"
        } else if !(self.coingecko && self.coinmarketcap && self.cmc_dex) {
            "degraded"
        } else {
            "healthy"
        }
    }
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    status: Arc<RwLock<ComponentHealth>>,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            status: Arc::new(RwLock::new(ComponentHealth {
                database: false,
                coingecko: false,
                coinmarketcap: false,
                cmc_dex: false,
                scheduler: false,
                extra: HashMap::new(),
            })),
        }
    }

    pub async fn get_status(&self) -> HealthStatus {
        let components = self.status.read().await.clone();

        HealthStatus {
            status: components.overall().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
        }
    }

    pub async fn update_component(&self, component: &str, healthy: bool) {
        let mut status = self.status.write().await;
        match component {
            "database" => status.database = healthy,
            "coingecko" => status.coingecko = healthy,
            "coinmarketcap" => status.coinmarketcap = healthy,
            "cmc_dex" => status.cmc_dex = healthy,
            "scheduler" => status.scheduler = healthy,
            _ => {
                status.extra.insert(component.to_string(), healthy);
            }
        }
    }
}
