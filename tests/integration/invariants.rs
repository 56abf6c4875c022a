//! Properties that must hold for any producer/consumer mix.

use std::time::Duration;

use sluice_engine::Pipeline;

use crate::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_occupancy_never_exceeds_capacity() {
    for (streams, workers, capacity) in [(16, 1, 4), (8, 8, 1), (2, 16, 32), (12, 0, 10)] {
        let mut config = base_config();
        config.pipeline.streams_count = streams;
        config.pipeline.workers_count = workers;
        config.pipeline.buffer_size = capacity;
        config.pipeline.stream_interval_ms = 1;

        let running = Pipeline::with_processor(config, fixed_delay(Duration::from_millis(2)))
            .start()
            .unwrap();
        for _ in 0..20 {
            assert!(running.channel().len() <= capacity);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        let peak = running.channel().peak_len();
        within(SETTLE, "shutdown", running.shutdown()).await.unwrap();
        assert!(peak <= capacity, "peak {peak} exceeded capacity {capacity}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_accounting_never_exceeds_generation() {
    let mut config = base_config();
    config.pipeline.streams_count = 12;
    config.pipeline.workers_count = 3;
    config.pipeline.buffer_size = 8;
    config.pipeline.stream_interval_ms = 1;

    let running = Pipeline::with_processor(config, fixed_delay(Duration::from_millis(3)))
        .start()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let report = within(SETTLE, "shutdown", running.shutdown()).await.unwrap();

    let s = &report.summary;
    assert!(s.processed + s.dropped + s.failed <= report.generated);
    // Every attempt is accounted for once the pipeline is stopped, except
    // chunks generated just as shutdown fired.
    assert!(
        s.processed + s.dropped + s.failed + report.undelivered as u64 + report.streams.len() as u64
            >= report.generated
    );
    assert!(s.dropped > 0, "12 fast streams should overrun 3 slow workers");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_latency_statistics_are_ordered() {
    let mut config = base_config();
    config.processing.min_delay_ms = 1;
    config.processing.max_delay_ms = 10;

    let running = Pipeline::new(config).start().unwrap();
    let metrics = running.metrics().clone();
    eventually("enough samples", || metrics.processed() >= 50).await;
    let report = within(SETTLE, "shutdown", running.shutdown()).await.unwrap();

    let lat = report.summary.latency.expect("latency present");
    assert!(lat.p50 <= lat.p95 && lat.p95 <= lat.p99);
    assert!(lat.min <= lat.avg && lat.avg <= lat.max);
    assert!(lat.p99 <= lat.max);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_summary_is_stable_without_writes() {
    let mut config = base_config();
    config.pipeline.chunks_per_stream = 25;
    config.pipeline.buffer_size = 1_000;

    let running = Pipeline::new(config).start().unwrap();
    eventually("producers finished", || running.producers_finished()).await;
    let metrics = running.metrics().clone();
    eventually("queue drained", || metrics.processed() == 100).await;

    let a = metrics.summary();
    let b = metrics.summary();
    assert_eq!(a.processed, b.processed);
    assert_eq!(a.dropped, b.dropped);
    assert_eq!(a.latency, b.latency);
    assert!(processed_plus_dropped(&metrics) <= 100);

    within(SETTLE, "shutdown", running.shutdown()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zero_capacity_drops_every_chunk() {
    let mut config = base_config();
    config.pipeline.buffer_size = 0;
    config.pipeline.chunks_per_stream = 10;

    let running = Pipeline::new(config).start().unwrap();
    eventually("producers finished", || running.producers_finished()).await;
    let report = within(SETTLE, "shutdown", running.shutdown()).await.unwrap();

    assert_eq!(report.generated, 40);
    assert_eq!(report.summary.dropped, 40);
    assert_eq!(report.summary.processed, 0);
}
