use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Scheduler metrics
    pub static ref JOBS_TRIGGERED: IntCounterVec = IntCounterVec::new(
        Opts::new("collector_jobs_triggered_total", "Timer triggers that began a run"),
        &["job"]
    ).unwrap();

    pub static ref JOBS_SKIPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("collector_jobs_skipped_total", "Triggers dropped because the previous run was still active"),
        &["job"]
    ).unwrap();

    pub static ref JOBS_FAILED: IntCounterVec = IntCounterVec::new(
        Opts::new("collector_jobs_failed_total", "Runs that ended in an error or panic"),
        &["job"]
    ).unwrap();

    pub static ref JOB_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("collector_job_duration_seconds", "Wall time of completed runs")
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
        &["job"]
    ).unwrap();

    // Data metrics
    pub static ref RECORDS_INSERTED: IntCounterVec = IntCounterVec::new(
        Opts::new("collector_records_inserted_total", "Rows committed per data domain"),
        &["domain"]
    ).unwrap();

    // Provider metrics
    pub static ref API_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("collector_api_requests_total", "Provider calls by final outcome"),
        &["provider", "outcome"]
    ).unwrap();

    pub static ref API_RETRIES: IntCounterVec = IntCounterVec::new(
        Opts::new("collector_api_retries_total", "Backoff retries per provider"),
        &["provider"]
    ).unwrap();

    pub static ref STARTUP_TIMESTAMP: IntGauge = IntGauge::new(
        "collector_startup_timestamp_seconds",
        "Unix timestamp of service startup"
    ).unwrap();
}

pub fn register_metrics() {
    REGISTRY.register(Box::new(JOBS_TRIGGERED.clone())).unwrap();
    REGISTRY.register(Box::new(JOBS_SKIPPED.clone())).unwrap();
    REGISTRY.register(Box::new(JOBS_FAILED.clone())).unwrap();
    REGISTRY.register(Box::new(JOB_DURATION.clone())).unwrap();
    REGISTRY.register(Box::new(RECORDS_INSERTED.clone())).unwrap();
    REGISTRY.register(Box::new(API_REQUESTS.clone())).unwrap();
    REGISTRY.register(Box::new(API_RETRIES.clone())).unwrap();
    REGISTRY.register(Box::new(STARTUP_TIMESTAMP.clone())).unwrap();
}

pub fn record_job_triggered(job: &str) {
    JOBS_TRIGGERED.with_label_values(&[job]).inc();
}

pub fn record_job_skipped(job: &str) {
    JOBS_SKIPPED.with_label_values(&[job]).inc();
}

pub fn record_job_failed(job: &str) {
    JOBS_FAILED.with_label_values(&[job]).inc();
}

pub fn observe_job_duration(job: &str, seconds: f64) {
    JOB_DURATION.with_label_values(&[job]).observe(seconds);
}

pub fn record_records_inserted(domain: &str, count: u64) {
    RECORDS_INSERTED.with_label_values(&[domain]).inc_by(count);
}

pub fn record_api_request(provider: &str, outcome: &str) {
    API_REQUESTS.with_label_values(&[provider, outcome]).inc();
}

pub fn record_api_retry(provider: &str) {
    API_RETRIES.with_label_values(&[provider]).inc();
}

pub fn mark_startup() {
    STARTUP_TIMESTAMP.set(chrono::Utc::now().timestamp());
}

/// Prometheus text exposition of everything in the registry.
pub fn export() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!(error = %err, "metrics encoding failed");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
