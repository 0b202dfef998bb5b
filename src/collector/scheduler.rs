use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::monitoring::metrics;

pub type JobFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<u64>> + Send + Sync>;
pub type CleanupFn = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// A named job bound to one coordinator method and an interval.
pub struct JobSpec {
    pub id: &'static str,
    pub interval: Duration,
    pub run: JobFn,
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;

struct JobDescriptor {
    id: &'static str,
    interval: Duration,
    run: JobFn,
    state: AtomicU8,
    runs: AtomicU64,
    skips: AtomicU64,
    failures: AtomicU64,
    last_result: Mutex<Option<RunSummary>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// "ok", "failed" or "panicked".
    pub outcome: String,
    pub records: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: &'static str,
    pub running: bool,
    pub runs: u64,
    pub skips: u64,
    pub failures: u64,
    pub last: Option<RunSummary>,
}

/// Drives the registered jobs on their intervals.
///
/// A trigger only fires a job that is IDLE; triggers landing while the
/// previous run is still active are counted as skips and dropped, so a job is
/// never invoked concurrently with itself. Jobs with different ids are fully
/// independent. The first tick fires immediately, giving an initial
/// collection right after `start()`.
pub struct JobScheduler {
    jobs: Vec<Arc<JobDescriptor>>,
    shutdown_flag: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    ticker_handles: Mutex<Vec<JoinHandle<()>>>,
    cleanup: Mutex<Option<CleanupFn>>,
    started: AtomicBool,
}

impl JobScheduler {
    pub fn new(specs: Vec<JobSpec>, cleanup: CleanupFn) -> Self {
        let jobs = specs
            .into_iter()
            .map(|spec| {
                Arc::new(JobDescriptor {
                    id: spec.id,
                    interval: spec.interval,
                    run: spec.run,
                    state: AtomicU8::new(IDLE),
                    runs: AtomicU64::new(0),
                    skips: AtomicU64::new(0),
                    failures: AtomicU64::new(0),
                    last_result: Mutex::new(None),
                })
            })
            .collect();

        Self {
            jobs,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            ticker_handles: Mutex::new(Vec::new()),
            cleanup: Mutex::new(Some(cleanup)),
            started: AtomicBool::new(false),
        }
    }

    /// Spawns one ticker task per job.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("⚠️ Scheduler already started");
            return;
        }

        let mut handles = self.ticker_handles.lock().await;
        for job in &self.jobs {
            tracing::info!(
                job = job.id,
                interval_secs = job.interval.as_secs(),
                "🚀 Scheduling job"
            );
            handles.push(spawn_ticker(
                job.clone(),
                self.shutdown_flag.clone(),
                self.shutdown_notify.clone(),
            ));
        }
    }

    /// Stops scheduling, waits up to `grace` for running jobs to finish,
    /// then runs the cleanup hook. The hook runs once no matter how often
    /// shutdown is called.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_waiters();
        tracing::info!("🛑 Scheduler shutting down...");

        let handles: Vec<_> = self.ticker_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            let running = self
                .jobs
                .iter()
                .filter(|job| job.state.load(Ordering::SeqCst) == RUNNING)
                .count();
            if running == 0 {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(running, "⚠️ Grace period expired with jobs still running");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        if let Some(cleanup) = self.cleanup.lock().await.take() {
            cleanup().await;
        }
        tracing::info!("✅ Scheduler stopped");
    }

    pub async fn snapshots(&self) -> Vec<JobSnapshot> {
        let mut snapshots = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            snapshots.push(JobSnapshot {
                id: job.id,
                running: job.state.load(Ordering::SeqCst) == RUNNING,
                runs: job.runs.load(Ordering::SeqCst),
                skips: job.skips.load(Ordering::SeqCst),
                failures: job.failures.load(Ordering::SeqCst),
                last: job.last_result.lock().await.clone(),
            });
        }
        snapshots
    }
}

fn spawn_ticker(
    job: Arc<JobDescriptor>,
    shutdown_flag: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(job.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = shutdown_notify.notified();
        tokio::pin!(shutdown);
        // notify_waiters() only wakes already-registered waiters; register
        // before the first tick so a shutdown racing task startup is not
        // missed until the next interval.
        shutdown.as_mut().enable();
        if shutdown_flag.load(Ordering::SeqCst) {
            return;
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if shutdown_flag.load(Ordering::SeqCst) {
                        break;
                    }
                    trigger(&job);
                }
                _ = &mut shutdown => break,
            }
        }
    })
}

/// IDLE → RUNNING via compare-and-set; a losing trigger is a skip.
fn trigger(job: &Arc<JobDescriptor>) {
    if job
        .state
        .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        job.skips.fetch_add(1, Ordering::SeqCst);
        metrics::record_job_skipped(job.id);
        tracing::debug!(job = job.id, "previous run still active, trigger dropped");
        return;
    }

    job.runs.fetch_add(1, Ordering::SeqCst);
    metrics::record_job_triggered(job.id);
    let job = job.clone();
    tokio::spawn(run_job(job));
}

async fn run_job(job: Arc<JobDescriptor>) {
    let started_at = Utc::now();
    let clock = tokio::time::Instant::now();
    tracing::debug!(job = job.id, "job started");

    let result = AssertUnwindSafe((job.run)()).catch_unwind().await;
    let duration = clock.elapsed();
    metrics::observe_job_duration(job.id, duration.as_secs_f64());

    let summary = match result {
        Ok(Ok(records)) => {
            tracing::info!(job = job.id, records, "✅ Job completed");
            RunSummary {
                started_at,
                duration_ms: duration.as_millis() as u64,
                outcome: "ok".to_string(),
                records: Some(records),
                error: None,
            }
        }
        Ok(Err(err)) => {
            job.failures.fetch_add(1, Ordering::SeqCst);
            metrics::record_job_failed(job.id);
            tracing::error!(job = job.id, "❌ Job failed: {:#}", err);
            RunSummary {
                started_at,
                duration_ms: duration.as_millis() as u64,
                outcome: "failed".to_string(),
                records: None,
                error: Some(err.to_string()),
            }
        }
        Err(panic) => {
            job.failures.fetch_add(1, Ordering::SeqCst);
            metrics::record_job_failed(job.id);
            let detail = panic_message(panic);
            tracing::error!(job = job.id, "❌ Job panicked: {}", detail);
            RunSummary {
                started_at,
                duration_ms: duration.as_millis() as u64,
                outcome: "panicked".to_string(),
                records: None,
                error: Some(detail),
            }
        }
    };

    // Publish the summary before releasing RUNNING so a snapshot taken
    // after the state flip always sees the finished run.
    *job.last_result.lock().await = Some(summary);
    job.state.store(IDLE, Ordering::SeqCst);
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
