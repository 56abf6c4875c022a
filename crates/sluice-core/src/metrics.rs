//! Metrics aggregator — processed/dropped/failed counters plus a bounded
//! latency sample set, summarised on demand.
//!
//! All mutable state sits behind one `RwLock`: writers take it exclusively
//! for a single counter bump or append, `summary()` takes it shared, so a
//! summary never sees a half-applied update.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

use crate::reservoir::{percentile, LatencyReservoir};

pub const DEFAULT_RESERVOIR_SIZE: usize = 10_000;

#[derive(Debug)]
struct MetricsState {
    processed: u64,
    dropped: u64,
    failed: u64,
    latency_total: Duration,
    latency_min: Option<Duration>,
    latency_max: Option<Duration>,
    reservoir: LatencyReservoir,
}

#[derive(Debug)]
pub struct Metrics {
    state: RwLock<MetricsState>,
    start_time: Instant,
}

impl Metrics {
    pub fn new(reservoir_size: usize) -> Self {
        Self::with_reservoir(LatencyReservoir::new(reservoir_size))
    }

    pub fn with_reservoir(reservoir: LatencyReservoir) -> Self {
        Self {
            state: RwLock::new(MetricsState {
                processed: 0,
                dropped: 0,
                failed: 0,
                latency_total: Duration::ZERO,
                latency_min: None,
                latency_max: None,
                reservoir,
            }),
            start_time: Instant::now(),
        }
    }

    /// Count one successfully processed chunk and keep its latency.
    pub fn record_processed(&self, latency: Duration) {
        let mut state = self.state.write();
        state.processed += 1;
        state.observe_latency(latency);
    }

    /// Count one chunk whose processing failed. Its latency is still observed.
    pub fn record_failed(&self, latency: Duration) {
        let mut state = self.state.write();
        state.failed += 1;
        state.observe_latency(latency);
    }

    /// Count one chunk rejected by a full channel.
    pub fn record_dropped(&self) {
        self.state.write().dropped += 1;
    }

    pub fn processed(&self) -> u64 {
        self.state.read().processed
    }

    pub fn dropped(&self) -> u64 {
        self.state.read().dropped
    }

    pub fn failed(&self) -> u64 {
        self.state.read().failed
    }

    /// Consistent snapshot of every counter plus latency statistics.
    pub fn summary(&self) -> Summary {
        let state = self.state.read();
        let elapsed = self.start_time.elapsed();
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 {
            state.processed as f64 / secs
        } else {
            0.0
        };

        let latency = if state.reservoir.is_empty() {
            None
        } else {
            let sorted = state.reservoir.sorted();
            let observed = state.reservoir.seen();
            let avg = if observed > 0 {
                Duration::from_nanos((state.latency_total.as_nanos() / observed as u128) as u64)
            } else {
                Duration::ZERO
            };
            // sorted is non-empty here, so every percentile is Some
            Some(LatencyStats {
                avg,
                p50: percentile(&sorted, 0.50).unwrap_or_default(),
                p95: percentile(&sorted, 0.95).unwrap_or_default(),
                p99: percentile(&sorted, 0.99).unwrap_or_default(),
                min: state.latency_min.unwrap_or_default(),
                max: state.latency_max.unwrap_or_default(),
                samples: sorted.len(),
                observed,
            })
        };

        Summary {
            processed: state.processed,
            dropped: state.dropped,
            failed: state.failed,
            elapsed,
            throughput,
            latency,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVOIR_SIZE)
    }
}

impl MetricsState {
    fn observe_latency(&mut self, latency: Duration) {
        self.latency_total += latency;
        self.latency_min = Some(self.latency_min.map_or(latency, |m| m.min(latency)));
        self.latency_max = Some(self.latency_max.map_or(latency, |m| m.max(latency)));
        self.reservoir.record(latency);
    }
}

/// Latency distribution. Present only when at least one latency was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    /// Mean over every observed latency, not just the retained samples.
    pub avg: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Samples retained in the reservoir.
    pub samples: usize,
    /// Latencies observed over the run.
    pub observed: u64,
}

/// Point-in-time metrics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub processed: u64,
    pub dropped: u64,
    pub failed: u64,
    pub elapsed: Duration,
    /// Processed chunks per second of elapsed time.
    pub throughput: f64,
    pub latency: Option<LatencyStats>,
}

impl Summary {
    /// Flat JSON rendering with durations in milliseconds.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "processed": self.processed,
            "dropped": self.dropped,
            "failed": self.failed,
            "elapsed_secs": self.elapsed.as_secs_f64(),
            "throughput_per_sec": self.throughput,
        });
        if let (Some(lat), Some(obj)) = (self.latency, value.as_object_mut()) {
            obj.insert("avg_latency_ms".into(), ms(lat.avg).into());
            obj.insert("p50_ms".into(), ms(lat.p50).into());
            obj.insert("p95_ms".into(), ms(lat.p95).into());
            obj.insert("p99_ms".into(), ms(lat.p99).into());
            obj.insert("min_latency_ms".into(), ms(lat.min).into());
            obj.insert("max_latency_ms".into(), ms(lat.max).into());
            obj.insert("latency_samples".into(), lat.samples.into());
        }
        value
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed:   {}", self.processed)?;
        writeln!(f, "Dropped:     {}", self.dropped)?;
        if self.failed > 0 {
            writeln!(f, "Failed:      {}", self.failed)?;
        }
        writeln!(f, "Elapsed:     {:.2?}", self.elapsed)?;
        write!(f, "Throughput:  {:.2} chunks/s", self.throughput)?;
        if let Some(lat) = &self.latency {
            writeln!(f)?;
            writeln!(f, "Avg latency: {:.2?}", lat.avg)?;
            writeln!(f, "P50 latency: {:.2?}", lat.p50)?;
            writeln!(f, "P95 latency: {:.2?}", lat.p95)?;
            write!(f, "P99 latency: {:.2?}", lat.p99)?;
        }
        Ok(())
    }
}
