use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// `RUST_LOG` wins when set; otherwise the configured level applies to this
/// crate and the noisier HTTP/database internals stay at warn.
pub fn init_logging(log_level: &str) {
    let default_directives = format!("{log_level},hyper=warn,reqwest=warn,sqlx=warn");
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();

    tracing::info!("Logging initialized at level: {}", log_level);
}
