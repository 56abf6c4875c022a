//! sluice-engine — producer/consumer orchestration over the shared bounded
//! channel.
//!
//! `Pipeline::start` spawns one task per stream producer and per worker
//! consumer, all observing one shutdown signal. `RunningPipeline::shutdown`
//! raises it and waits for every task to return.

pub mod consumer;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod producer;
pub mod reporter;

pub use consumer::{ConsumerReport, WorkerConsumer};
pub use error::PipelineError;
pub use pipeline::{Pipeline, RunReport, RunningPipeline};
pub use processor::{ChunkProcessor, SimulatedProcessor};
pub use producer::{ProducerReport, StreamProducer};
