//! Stream producer — generates chunks at random intervals and offers each
//! one to the shared channel without waiting.
//!
//! A full channel means the chunk is dropped and counted; the producer
//! never retries and never blocks on the consumers.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sluice_core::chunk::random_payload;
use sluice_core::config::PipelineConfig;
use sluice_core::{BoundedChannel, Chunk, Metrics, Shutdown};

/// What a producer did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
    pub stream_id: u32,
    /// Generation attempts, accepted or not.
    pub generated: u64,
    pub dropped: u64,
}

pub struct StreamProducer {
    stream_id: u32,
    channel: Arc<BoundedChannel>,
    metrics: Arc<Metrics>,
    shutdown: Shutdown,
    max_chunk_size: usize,
    max_interval_ms: u64,
    limit: Option<u64>,
    // Private to this producer so streams never contend on a generator.
    rng: StdRng,
}

impl StreamProducer {
    pub fn new(
        stream_id: u32,
        config: &PipelineConfig,
        channel: Arc<BoundedChannel>,
        metrics: Arc<Metrics>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            stream_id,
            channel,
            metrics,
            shutdown,
            max_chunk_size: config.chunk_size_bytes,
            max_interval_ms: config.stream_interval_ms,
            limit: config.chunk_limit(),
            rng: StdRng::seed_from_u64(stream_seed(stream_id)),
        }
    }

    pub async fn run(mut self) -> ProducerReport {
        let mut report = ProducerReport {
            stream_id: self.stream_id,
            ..Default::default()
        };
        tracing::debug!(stream_id = self.stream_id, "stream started");

        loop {
            if self.shutdown.is_triggered() {
                break;
            }
            if self.limit.is_some_and(|limit| report.generated >= limit) {
                tracing::debug!(stream_id = self.stream_id, "chunk limit reached");
                break;
            }

            let chunk = self.generate(report.generated);
            report.generated += 1;

            // Cancellation before the insert attempt ends the stream without a drop.
            if self.shutdown.is_triggered() {
                break;
            }
            if let Err(e) = self.channel.try_send(chunk) {
                let chunk = e.into_inner();
                self.metrics.record_dropped();
                report.dropped += 1;
                tracing::trace!(
                    stream_id = self.stream_id,
                    sequence_id = chunk.sequence_id(),
                    "chunk dropped, channel full"
                );
            }

            if !self.pause().await {
                break;
            }
        }

        tracing::debug!(
            stream_id = self.stream_id,
            generated = report.generated,
            dropped = report.dropped,
            "stream stopped"
        );
        report
    }

    fn generate(&mut self, sequence_id: u64) -> Chunk {
        let len = self.rng.gen_range(0..=self.max_chunk_size);
        Chunk::new(sequence_id, self.stream_id, random_payload(len))
    }

    /// Sleep a random interval, cut short by shutdown. Returns false when
    /// the producer should stop.
    async fn pause(&mut self) -> bool {
        let ms = self.rng.gen_range(0..=self.max_interval_ms);
        if ms == 0 {
            tokio::task::yield_now().await;
            return !self.shutdown.is_triggered();
        }
        tokio::select! {
            biased;
            _ = self.shutdown.wait() => false,
            _ = tokio::time::sleep(Duration::from_millis(ms)) => true,
        }
    }
}

/// Wall clock mixed with the stream id, so producers started in the same
/// instant still get distinct sequences.
fn stream_seed(stream_id: u32) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    nanos ^ (u64::from(stream_id) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
