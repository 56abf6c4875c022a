//! Chunk processors — the opaque work a consumer performs per chunk.
//!
//! Processors are synchronous and may block; consumers run them on the
//! blocking pool and never interrupt them.

use std::time::Duration;

use rand::Rng;
use sluice_core::config::ProcessingConfig;
use sluice_core::Chunk;

/// Work performed on each consumed chunk. Returns an integer result derived
/// from the payload; an error marks the chunk processed-with-error.
pub trait ChunkProcessor: Send + Sync {
    fn process(&self, chunk: &Chunk) -> anyhow::Result<usize>;
}

impl<F> ChunkProcessor for F
where
    F: Fn(&Chunk) -> anyhow::Result<usize> + Send + Sync,
{
    fn process(&self, chunk: &Chunk) -> anyhow::Result<usize> {
        self(chunk)
    }
}

/// Stand-in for an external engine: sleeps a uniform random delay and
/// returns the payload length.
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl SimulatedProcessor {
    /// Bounds are reordered if given inverted.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        let (a, b) = (min_delay.as_millis() as u64, max_delay.as_millis() as u64);
        Self {
            min_delay_ms: a.min(b),
            max_delay_ms: a.max(b),
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Returns immediately.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    fn delay(&self) -> Duration {
        let ms = if self.min_delay_ms == self.max_delay_ms {
            self.min_delay_ms
        } else {
            rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms)
        };
        Duration::from_millis(ms)
    }
}

impl ChunkProcessor for SimulatedProcessor {
    fn process(&self, chunk: &Chunk) -> anyhow::Result<usize> {
        let delay = self.delay();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(chunk.len())
    }
}
