//! Sluice integration test harness.
//!
//! Runs whole pipelines in-process on a multi-threaded runtime. Every wait
//! is bounded by a timeout so a stuck task fails the test instead of
//! hanging it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sluice_core::{Chunk, Metrics, SluiceConfig};
use sluice_engine::ChunkProcessor;

mod invariants;
mod shutdown;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Generous ceiling for anything that should finish "promptly".
pub const SETTLE: Duration = Duration::from_secs(5);

/// Small pipeline with live reporting off and instant processing.
pub fn base_config() -> SluiceConfig {
    let mut config = SluiceConfig::default();
    config.pipeline.workers_count = 4;
    config.pipeline.streams_count = 4;
    config.pipeline.stream_interval_ms = 2;
    config.pipeline.chunk_size_bytes = 256;
    config.pipeline.buffer_size = 64;
    config.processing.min_delay_ms = 0;
    config.processing.max_delay_ms = 0;
    config.processing.high_latency_ms = 0;
    config.metrics.report_interval_secs = 0;
    config
}

/// Processor that sleeps a fixed time and returns the payload length.
pub fn fixed_delay(delay: Duration) -> Arc<dyn ChunkProcessor> {
    Arc::new(move |chunk: &Chunk| -> anyhow::Result<usize> {
        std::thread::sleep(delay);
        Ok(chunk.len())
    })
}

/// Poll `cond` every few milliseconds until it holds or `SETTLE` elapses.
pub async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    let polled = tokio::time::timeout(SETTLE, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for: {what}");
}

/// Await `fut`, failing the test if it outlives `limit`.
pub async fn within<T>(limit: Duration, what: &str, fut: impl Future<Output = T>) -> T {
    match tokio::time::timeout(limit, fut).await {
        Ok(v) => v,
        Err(_) => panic!("{what} did not finish within {limit:?}"),
    }
}

pub fn processed_plus_dropped(metrics: &Metrics) -> u64 {
    metrics.processed() + metrics.dropped()
}

// ── Smoke ─────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pipeline_moves_chunks() {
    let pipeline = sluice_engine::Pipeline::new(base_config());
    let running = pipeline.start().expect("pipeline should start");

    let metrics = running.metrics().clone();
    eventually("some chunks processed", || metrics.processed() >= 20).await;

    let report = within(SETTLE, "shutdown", running.shutdown())
        .await
        .expect("clean shutdown");
    assert!(report.summary.processed >= 20);
    assert!(report.summary.latency.is_some());
}
