use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crypto_market_collector::collector::{CleanupFn, JobFn, JobScheduler, JobSpec};

fn counting_cleanup(count: Arc<AtomicU64>) -> CleanupFn {
    Box::new(move || {
        async move {
            count.fetch_add(1, Ordering::SeqCst);
        }
        .boxed()
    })
}

/// Job that raises a per-job and a shared concurrency gauge while it runs.
fn gauged_job(
    run_for: Duration,
    own_current: Arc<AtomicU64>,
    own_max: Arc<AtomicU64>,
    shared_current: Arc<AtomicU64>,
    shared_max: Arc<AtomicU64>,
) -> JobFn {
    Arc::new(move || {
        let own_current = own_current.clone();
        let own_max = own_max.clone();
        let shared_current = shared_current.clone();
        let shared_max = shared_max.clone();
        async move {
            let own = own_current.fetch_add(1, Ordering::SeqCst) + 1;
            own_max.fetch_max(own, Ordering::SeqCst);
            let shared = shared_current.fetch_add(1, Ordering::SeqCst) + 1;
            shared_max.fetch_max(shared, Ordering::SeqCst);

            tokio::time::sleep(run_for).await;

            own_current.fetch_sub(1, Ordering::SeqCst);
            shared_current.fetch_sub(1, Ordering::SeqCst);
            Ok(1)
        }
        .boxed()
    })
}

#[tokio::test(start_paused = true)]
async fn independent_jobs_overlap_while_each_job_coalesces() {
    let shared_current = Arc::new(AtomicU64::new(0));
    let shared_max = Arc::new(AtomicU64::new(0));
    let alpha_current = Arc::new(AtomicU64::new(0));
    let alpha_max = Arc::new(AtomicU64::new(0));
    let beta_current = Arc::new(AtomicU64::new(0));
    let beta_max = Arc::new(AtomicU64::new(0));

    // Two jobs on a 1s cadence whose runs take 2.5s: each job must coalesce
    // its own overlapping triggers while the pair still runs side by side.
    let specs = vec![
        JobSpec {
            id: "alpha",
            interval: Duration::from_secs(1),
            run: gauged_job(
                Duration::from_millis(2500),
                alpha_current.clone(),
                alpha_max.clone(),
                shared_current.clone(),
                shared_max.clone(),
            ),
        },
        JobSpec {
            id: "beta",
            interval: Duration::from_secs(1),
            run: gauged_job(
                Duration::from_millis(2500),
                beta_current.clone(),
                beta_max.clone(),
                shared_current.clone(),
                shared_max.clone(),
            ),
        },
    ];

    let cleanup_count = Arc::new(AtomicU64::new(0));
    let scheduler = JobScheduler::new(specs, counting_cleanup(cleanup_count.clone()));
    scheduler.start().await;

    tokio::time::sleep(Duration::from_millis(9100)).await;
    scheduler.shutdown(Duration::from_secs(5)).await;

    // Runs land at t=0, 3, 6 and 9; the ticks at 1, 2, 4, 5, 7 and 8 hit a
    // busy job and are dropped.
    let snapshots = scheduler.snapshots().await;
    for snapshot in &snapshots {
        println!(
            "job {}: runs={} skips={} failures={}",
            snapshot.id, snapshot.runs, snapshot.skips, snapshot.failures
        );
        assert_eq!(snapshot.runs, 4);
        assert_eq!(snapshot.skips, 6);
        assert_eq!(snapshot.failures, 0);
        assert!(!snapshot.running);
    }

    assert_eq!(alpha_max.load(Ordering::SeqCst), 1);
    assert_eq!(beta_max.load(Ordering::SeqCst), 1);
    assert_eq!(shared_max.load(Ordering::SeqCst), 2);
    assert_eq!(shared_current.load(Ordering::SeqCst), 0);
    assert_eq!(cleanup_count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_drains_an_in_flight_run_before_cleanup() {
    let specs = vec![JobSpec {
        id: "prices",
        interval: Duration::from_secs(60),
        run: Arc::new(|| {
            async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(42)
            }
            .boxed()
        }),
    }];

    let cleanup_count = Arc::new(AtomicU64::new(0));
    let scheduler = JobScheduler::new(specs, counting_cleanup(cleanup_count.clone()));
    scheduler.start().await;

    // Let the immediate first trigger get in flight, then stop while it is
    // still sleeping. Shutdown should wait the ~300ms out, not abandon it.
    tokio::time::sleep(Duration::from_millis(10)).await;
    scheduler.shutdown(Duration::from_secs(5)).await;

    let snapshots = scheduler.snapshots().await;
    assert_eq!(snapshots[0].runs, 1);
    assert!(!snapshots[0].running);
    let last = snapshots[0].last.as_ref().unwrap();
    assert_eq!(last.outcome, "ok");
    assert_eq!(last.records, Some(42));
    assert_eq!(cleanup_count.load(Ordering::SeqCst), 1);

    let rendered = serde_json::to_string(&snapshots).unwrap();
    assert!(rendered.contains("\"outcome\":\"ok\""));
}

#[tokio::test(start_paused = true)]
async fn shutdown_gives_up_on_a_stuck_job_after_the_grace_period() {
    let specs = vec![JobSpec {
        id: "stuck",
        interval: Duration::from_secs(60),
        run: Arc::new(|| {
            async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(0)
            }
            .boxed()
        }),
    }];

    let cleanup_count = Arc::new(AtomicU64::new(0));
    let scheduler = JobScheduler::new(specs, counting_cleanup(cleanup_count.clone()));
    scheduler.start().await;

    tokio::time::sleep(Duration::from_millis(10)).await;
    scheduler.shutdown(Duration::from_millis(200)).await;

    // The run never finished: cleanup must still happen after the grace
    // period instead of hanging shutdown forever.
    let snapshots = scheduler.snapshots().await;
    assert_eq!(snapshots[0].runs, 1);
    assert!(snapshots[0].running);
    assert!(snapshots[0].last.is_none());
    assert_eq!(cleanup_count.load(Ordering::SeqCst), 1);
}
