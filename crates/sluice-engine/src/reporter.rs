//! Periodic metrics log line while the pipeline runs.

use std::sync::Arc;
use std::time::Duration;

use sluice_core::{BoundedChannel, Metrics, Shutdown};

pub async fn report_loop(
    metrics: Arc<Metrics>,
    channel: Arc<BoundedChannel>,
    period: Duration,
    mut shutdown: Shutdown,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it.
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => return,
            _ = interval.tick() => {
                let summary = metrics.summary();
                let p99_ms = summary.latency.map(|l| l.p99.as_millis() as u64);
                tracing::info!(
                    processed = summary.processed,
                    dropped = summary.dropped,
                    failed = summary.failed,
                    throughput = summary.throughput,
                    p99_ms,
                    occupancy = channel.len(),
                    utilization = channel.utilization(),
                    "pipeline stats"
                );
            }
        }
    }
}
