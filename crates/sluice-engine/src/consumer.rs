//! Worker consumer — takes chunks off the shared channel, runs the
//! processor on each and records end-to-end latency.
//!
//! A processor call in flight when shutdown fires is allowed to finish;
//! the worker notices the signal on its next loop iteration.

use std::sync::Arc;
use std::time::Duration;

use sluice_core::{BoundedChannel, Chunk, Metrics, Shutdown};

use crate::processor::ChunkProcessor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    pub worker_id: u32,
    pub processed: u64,
    pub failed: u64,
}

pub struct WorkerConsumer {
    worker_id: u32,
    channel: Arc<BoundedChannel>,
    metrics: Arc<Metrics>,
    processor: Arc<dyn ChunkProcessor>,
    shutdown: Shutdown,
    high_latency: Option<Duration>,
}

impl WorkerConsumer {
    pub fn new(
        worker_id: u32,
        channel: Arc<BoundedChannel>,
        metrics: Arc<Metrics>,
        processor: Arc<dyn ChunkProcessor>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            worker_id,
            channel,
            metrics,
            processor,
            shutdown,
            high_latency: None,
        }
    }

    /// Warn about chunks whose latency exceeds `threshold`.
    pub fn with_high_latency_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.high_latency = threshold;
        self
    }

    pub async fn run(mut self) -> ConsumerReport {
        let mut report = ConsumerReport {
            worker_id: self.worker_id,
            ..Default::default()
        };
        tracing::debug!(worker_id = self.worker_id, "worker started");

        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.shutdown.wait() => break,
                chunk = self.channel.recv() => chunk,
            };
            if self.handle(chunk).await {
                report.processed += 1;
            } else {
                report.failed += 1;
            }
        }

        tracing::debug!(
            worker_id = self.worker_id,
            processed = report.processed,
            failed = report.failed,
            "worker stopped"
        );
        report
    }

    /// Process one chunk. Returns false if the processor failed.
    async fn handle(&self, chunk: Chunk) -> bool {
        let created_at = chunk.created_at();
        let stream_id = chunk.stream_id();
        let sequence_id = chunk.sequence_id();
        let processor = self.processor.clone();

        let outcome = tokio::task::spawn_blocking(move || processor.process(&chunk)).await;
        let latency = created_at.elapsed();

        match outcome {
            Ok(Ok(result)) => {
                self.metrics.record_processed(latency);
                tracing::debug!(
                    worker_id = self.worker_id,
                    sequence_id,
                    stream_id,
                    result,
                    latency_ms = latency.as_millis() as u64,
                    "chunk processed"
                );
                if self.high_latency.is_some_and(|limit| latency > limit) {
                    tracing::warn!(
                        worker_id = self.worker_id,
                        sequence_id,
                        stream_id,
                        latency_ms = latency.as_millis() as u64,
                        "high latency"
                    );
                }
                true
            }
            Ok(Err(e)) => {
                self.metrics.record_failed(latency);
                tracing::warn!(
                    worker_id = self.worker_id,
                    sequence_id,
                    stream_id,
                    error = %e,
                    "chunk processing failed"
                );
                false
            }
            Err(e) => {
                // The processor panicked; the worker itself keeps going.
                self.metrics.record_failed(latency);
                tracing::warn!(
                    worker_id = self.worker_id,
                    sequence_id,
                    stream_id,
                    error = %e,
                    "chunk processor panicked"
                );
                false
            }
        }
    }
}
