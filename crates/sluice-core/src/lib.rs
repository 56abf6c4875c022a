//! sluice-core — shared types for the ingestion pipeline: chunks, the
//! bounded channel, metrics, shutdown signalling and configuration.
//! The engine and daemon crates depend on this one.

pub mod channel;
pub mod chunk;
pub mod config;
pub mod metrics;
pub mod reservoir;
pub mod shutdown;

pub use channel::{BoundedChannel, TrySendError};
pub use chunk::Chunk;
pub use config::SluiceConfig;
pub use metrics::{LatencyStats, Metrics, Summary};
pub use shutdown::{Shutdown, ShutdownSignal};
