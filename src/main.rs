use anyhow::Result;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;

use crypto_market_collector::collector::{CleanupFn, DataCoordinator, JobScheduler, JobSpec};
use crypto_market_collector::core::{logging, Config, HealthChecker};
use crypto_market_collector::monitoring::metrics;
use crypto_market_collector::storage;
use crypto_market_collector::storage::{MarketRepository, PgMarketRepository};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    logging::init_logging(&config.monitoring.log_level);

    tracing::info!("🚀 Crypto Market Collector starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    metrics::register_metrics();
    metrics::mark_startup();

    // Initialize health checker
    let health_checker = Arc::new(HealthChecker::new());

    // Database pool and schema
    let pool = storage::connect_pool(&config.database).await?;
    storage::initialize_schema(&pool).await?;
    health_checker.update_component("database", true).await;

    let repository: Arc<dyn MarketRepository> = Arc::new(PgMarketRepository::new(pool.clone()));

    // Provider sessions
    let coordinator = Arc::new(DataCoordinator::new(config.clone(), repository.clone()));
    if let Err(err) = coordinator.initialize().await {
        tracing::error!("❌ Provider initialization failed: {:#}", err);
        coordinator.cleanup().await;
        return Err(err);
    }
    for provider in ["coingecko", "coinmarketcap", "cmc_dex"] {
        health_checker.update_component(provider, true).await;
    }

    // Collection jobs
    let specs = build_job_specs(&config, &coordinator);
    if specs.is_empty() {
        tracing::warn!("⚠️ All collection jobs are disabled");
    }
    let cleanup_coordinator = coordinator.clone();
    let cleanup: CleanupFn = Box::new(move || {
        async move {
            cleanup_coordinator.cleanup().await;
        }
        .boxed()
    });
    let scheduler = Arc::new(JobScheduler::new(specs, cleanup));
    scheduler.start().await;
    health_checker.update_component("scheduler", true).await;

    // Health and metrics endpoint
    let server_health = health_checker.clone();
    let server_scheduler = scheduler.clone();
    let monitoring_port = config.monitoring.metrics_port;
    tokio::spawn(async move {
        start_monitoring_server(server_health, server_scheduler, monitoring_port).await
    });
    tracing::info!("✅ Monitoring endpoint running on port {}", monitoring_port);

    // Periodic status heartbeat
    let heartbeat_health = health_checker.clone();
    let heartbeat_scheduler = scheduler.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let status = heartbeat_health.get_status().await;
            let snapshots = heartbeat_scheduler.snapshots().await;
            let runs: u64 = snapshots.iter().map(|snapshot| snapshot.runs).sum();
            let failures: u64 = snapshots.iter().map(|snapshot| snapshot.failures).sum();
            tracing::info!(
                "Collector status: {} (uptime: {}s, runs: {}, failures: {})",
                status.status,
                status.uptime_seconds,
                runs,
                failures
            );
        }
    });

    // Block until the process is asked to stop
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("🛑 SIGINT received"),
        _ = sigterm.recv() => tracing::info!("🛑 SIGTERM received"),
    }

    health_checker.update_component("scheduler", false).await;
    scheduler.shutdown(config.schedule.shutdown_grace).await;

    match repository.statistics().await {
        Ok(stats) => tracing::info!(
            assets = stats.assets,
            venues = stats.venues,
            price_rows = stats.price_rows,
            sentiment_rows = stats.sentiment_rows,
            dex_snapshots = stats.dex_snapshots,
            "📊 Final storage statistics"
        ),
        Err(err) => tracing::warn!("⚠️ Could not read final statistics: {}", err),
    }

    pool.close().await;
    tracing::info!("✅ Shutdown complete");
    Ok(())
}

fn build_job_specs(config: &Config, coordinator: &Arc<DataCoordinator>) -> Vec<JobSpec> {
    let mut specs = Vec::new();

    if config.schedule.enable_prices {
        let coordinator = coordinator.clone();
        specs.push(JobSpec {
            id: "prices",
            interval: config.schedule.price_interval,
            run: Arc::new(move || {
                let coordinator = coordinator.clone();
                async move { Ok(coordinator.fetch_and_store_prices().await?) }.boxed()
            }),
        });
    }
    if config.schedule.enable_metadata {
        let coordinator = coordinator.clone();
        specs.push(JobSpec {
            id: "metadata",
            interval: config.schedule.metadata_interval,
            run: Arc::new(move || {
                let coordinator = coordinator.clone();
                async move { Ok(coordinator.fetch_and_store_metadata().await?) }.boxed()
            }),
        });
    }
    if config.schedule.enable_sentiment {
        let coordinator = coordinator.clone();
        specs.push(JobSpec {
            id: "sentiment",
            interval: config.schedule.sentiment_interval,
            run: Arc::new(move || {
                let coordinator = coordinator.clone();
                async move { Ok(coordinator.fetch_and_store_sentiment().await?) }.boxed()
            }),
        });
    }
    if config.schedule.enable_dex {
        let coordinator = coordinator.clone();
        specs.push(JobSpec {
            id: "dex_pairs",
            interval: config.schedule.dex_interval,
            run: Arc::new(move || {
                let coordinator = coordinator.clone();
                async move { Ok(coordinator.fetch_and_store_dex_pairs().await?) }.boxed()
            }),
        });
    }
    if config.schedule.enable_venues {
        let coordinator = coordinator.clone();
        specs.push(JobSpec {
            id: "venues",
            interval: config.schedule.venue_interval,
            run: Arc::new(move || {
                let coordinator = coordinator.clone();
                async move { Ok(coordinator.fetch_and_store_venues().await?) }.boxed()
            }),
        });
    }

    specs
}

async fn start_monitoring_server(
    health_checker: Arc<HealthChecker>,
    scheduler: Arc<JobScheduler>,
    port: u16,
) {
    use warp::Filter;

    let health = warp::path("health")
        .and(warp::any().map(move || health_checker.clone()))
        .and_then(|checker: Arc<HealthChecker>| async move {
            let status = checker.get_status().await;
            Ok::<_, warp::Rejection>(warp::reply::json(&status))
        });

    let jobs = warp::path("jobs")
        .and(warp::any().map(move || scheduler.clone()))
        .and_then(|scheduler: Arc<JobScheduler>| async move {
            let snapshots = scheduler.snapshots().await;
            Ok::<_, warp::Rejection>(warp::reply::json(&snapshots))
        });

    let metrics_page = warp::path("metrics").map(metrics::export);

    warp::serve(health.or(jobs).or(metrics_page))
        .run(([0, 0, 0, 0], port))
        .await;
}
