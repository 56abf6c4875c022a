//! Cooperative shutdown: every task returns within the interval and
//! processing ceilings, whatever it was doing when the signal fired.

use std::time::{Duration, Instant};

use sluice_engine::Pipeline;

use crate::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_interrupts_sleeping_producers() {
    let mut config = base_config();
    // Producers spend nearly all their time asleep.
    config.pipeline.stream_interval_ms = 60_000;
    config.pipeline.streams_count = 20;

    let running = Pipeline::new(config).start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let report = within(Duration::from_secs(2), "shutdown", running.shutdown())
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.streams.len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_waits_for_in_flight_processing() {
    let mut config = base_config();
    config.pipeline.workers_count = 2;
    config.pipeline.streams_count = 2;
    config.pipeline.stream_interval_ms = 0;
    config.pipeline.buffer_size = 4;

    let delay = Duration::from_millis(200);
    let running = Pipeline::with_processor(config, fixed_delay(delay))
        .start()
        .unwrap();

    // Let both workers pick up a chunk and enter the slow processor.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let report = within(Duration::from_secs(2), "shutdown", running.shutdown())
        .await
        .unwrap();
    // The in-flight calls finished rather than being abandoned.
    assert!(report.summary.processed >= 1);
    assert!(report.workers.iter().all(|w| w.failed == 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_external_trigger_stops_pipeline() {
    let pipeline = Pipeline::new(base_config());
    let running = pipeline.start().unwrap();
    let signal = running.shutdown_signal();

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        signal.trigger();
    });

    trigger.await.unwrap();
    // Unlimited streams only return once they have observed the signal.
    eventually("streams stopped by the external trigger", || {
        running.producers_finished()
    })
    .await;
    assert!(
        !running.shutdown_signal().trigger(),
        "signal should already be raised"
    );

    let report = within(SETTLE, "shutdown", running.shutdown()).await.unwrap();
    assert_eq!(report.workers.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_until_returns_after_trigger() {
    let pipeline = Pipeline::new(base_config());
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(40)).await;
        let _ = tx.send(());
    });

    let started = Instant::now();
    let report = within(
        SETTLE,
        "run_until",
        pipeline.run_until(async {
            let _ = rx.await;
        }),
    )
    .await
    .unwrap();
    // Returned only after the trigger task fired.
    assert!(started.elapsed() >= Duration::from_millis(40));
    assert_eq!(report.streams.len(), 4);
}
