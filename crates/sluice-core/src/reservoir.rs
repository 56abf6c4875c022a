//! Fixed-capacity latency reservoir (Algorithm R).
//!
//! Until `capacity` samples have been offered the reservoir holds every
//! sample in arrival order. After that, sample `n` replaces a uniformly
//! chosen slot with probability `capacity / n`, keeping memory bounded
//! while the retained set stays a uniform sample of the whole run.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug)]
pub struct LatencyReservoir {
    samples: Vec<Duration>,
    capacity: usize,
    seen: u64,
    rng: StdRng,
}

impl LatencyReservoir {
    /// Capacity is clamped to at least one slot so an observed latency is
    /// never discarded outright.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity.min(4096)),
            capacity,
            seen: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reservoir with a fixed seed, for reproducible replacement decisions.
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(capacity)
        }
    }

    pub fn record(&mut self, sample: Duration) {
        self.seen += 1;
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
            return;
        }
        let slot = self.rng.gen_range(0..self.seen);
        if (slot as usize) < self.capacity {
            self.samples[slot as usize] = sample;
        }
    }

    /// Retained samples in slot order (arrival order until the first replacement).
    pub fn samples(&self) -> &[Duration] {
        &self.samples
    }

    /// Total samples offered, including those not retained.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sorted copy of the retained samples.
    pub fn sorted(&self) -> Vec<Duration> {
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        sorted
    }
}

/// Value at rank `floor(n * p)` of an ascending slice, clamped to the last
/// element. `None` for an empty slice.
pub fn percentile(sorted: &[Duration], p: f64) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }
    let idx = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    Some(sorted[idx])
}
