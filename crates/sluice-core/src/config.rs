//! Configuration system for Sluice.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $SLUICE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/sluice/config.toml
//!   3. ~/.config/sluice/config.toml
//!
//! A missing file is not an error; defaults apply.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration. Built once at startup and shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SluiceConfig {
    pub pipeline: PipelineConfig,
    pub processing: ProcessingConfig,
    pub metrics: MetricsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Consumer tasks.
    pub workers_count: usize,
    /// Producer tasks.
    pub streams_count: usize,
    /// Upper bound of each producer's sleep between chunks.
    pub stream_interval_ms: u64,
    /// Upper bound of payload length.
    pub chunk_size_bytes: usize,
    /// Channel capacity. 0 = every chunk is dropped.
    pub buffer_size: usize,
    /// Generation attempts per producer. 0 = unlimited.
    pub chunks_per_stream: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Simulated processing delay is uniform in [min_delay_ms, max_delay_ms].
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Latencies above this are logged as warnings. 0 = never.
    pub high_latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Latency samples kept for percentile computation.
    pub reservoir_size: usize,
    /// Seconds between live summary log lines. 0 = disabled.
    pub report_interval_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers_count: 50,
            streams_count: 100,
            stream_interval_ms: 1000,
            chunk_size_bytes: 1024,
            buffer_size: 500,
            chunks_per_stream: 0,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 20,
            max_delay_ms: 50,
            high_latency_ms: 100,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            reservoir_size: crate::metrics::DEFAULT_RESERVOIR_SIZE,
            report_interval_secs: 5,
        }
    }
}

impl PipelineConfig {
    /// `None` when producers generate without limit.
    pub fn chunk_limit(&self) -> Option<u64> {
        (self.chunks_per_stream > 0).then_some(self.chunks_per_stream)
    }
}

impl ProcessingConfig {
    pub fn high_latency_threshold(&self) -> Option<Duration> {
        (self.high_latency_ms > 0).then(|| Duration::from_millis(self.high_latency_ms))
    }
}

impl MetricsConfig {
    pub fn report_interval(&self) -> Option<Duration> {
        (self.report_interval_secs > 0).then(|| Duration::from_secs(self.report_interval_secs))
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("sluice")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl SluiceConfig {
    /// Load config: env vars → file → defaults, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            Self::from_toml(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            SluiceConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("SLUICE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.min_delay_ms > self.processing.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "processing.min_delay_ms ({}) exceeds processing.max_delay_ms ({})",
                self.processing.min_delay_ms, self.processing.max_delay_ms
            )));
        }
        for (key, count) in [
            ("pipeline.workers_count", self.pipeline.workers_count),
            ("pipeline.streams_count", self.pipeline.streams_count),
        ] {
            task_count(key, count)?;
        }
        if self.metrics.reservoir_size == 0 {
            return Err(ConfigError::Invalid(
                "metrics.reservoir_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Apply SLUICE_* overrides. `lookup` resolves a variable name; the
    /// process environment in production, a map in tests.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let p = &mut self.pipeline;
        override_num(&lookup, "SLUICE_PIPELINE__WORKERS_COUNT", &mut p.workers_count);
        override_num(&lookup, "SLUICE_PIPELINE__STREAMS_COUNT", &mut p.streams_count);
        override_num(&lookup, "SLUICE_PIPELINE__STREAM_INTERVAL_MS", &mut p.stream_interval_ms);
        override_num(&lookup, "SLUICE_PIPELINE__CHUNK_SIZE_BYTES", &mut p.chunk_size_bytes);
        override_num(&lookup, "SLUICE_PIPELINE__BUFFER_SIZE", &mut p.buffer_size);
        override_num(&lookup, "SLUICE_PIPELINE__CHUNKS_PER_STREAM", &mut p.chunks_per_stream);

        let proc = &mut self.processing;
        override_num(&lookup, "SLUICE_PROCESSING__MIN_DELAY_MS", &mut proc.min_delay_ms);
        override_num(&lookup, "SLUICE_PROCESSING__MAX_DELAY_MS", &mut proc.max_delay_ms);
        override_num(&lookup, "SLUICE_PROCESSING__HIGH_LATENCY_MS", &mut proc.high_latency_ms);

        let m = &mut self.metrics;
        override_num(&lookup, "SLUICE_METRICS__RESERVOIR_SIZE", &mut m.reservoir_size);
        override_num(&lookup, "SLUICE_METRICS__REPORT_INTERVAL_SECS", &mut m.report_interval_secs);

        if let Some(v) = lookup("SLUICE_OUTPUT__FORMAT") {
            match v.to_ascii_lowercase().as_str() {
                "text" => self.output.format = OutputFormat::Text,
                "json" => self.output.format = OutputFormat::Json,
                _ => tracing::warn!(value = %v, "ignoring unknown SLUICE_OUTPUT__FORMAT"),
            }
        }
    }
}

/// Task ids are `u32`; a count beyond that range is a config error.
pub fn task_count(key: &str, count: usize) -> Result<u32, ConfigError> {
    u32::try_from(count)
        .map_err(|_| ConfigError::Invalid(format!("{key} ({count}) exceeds {}", u32::MAX)))
}

fn override_num<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    if let Some(v) = lookup(key) {
        match v.trim().parse() {
            Ok(parsed) => *slot = parsed,
            Err(_) => tracing::warn!(key, value = %v, "ignoring unparsable override"),
        }
    }
}
