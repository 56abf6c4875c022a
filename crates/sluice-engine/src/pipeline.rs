//! Lifecycle controller — starts every producer and consumer against one
//! shared channel and shutdown signal, then stops them cooperatively.
//!
//! No task is ever aborted. Shutdown completes once every task has
//! observed the signal and returned, so its latency is bounded by the
//! longest in-flight processor call or interval sleep.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use sluice_core::config::task_count;
use sluice_core::{BoundedChannel, Metrics, ShutdownSignal, SluiceConfig, Summary};

use crate::consumer::{ConsumerReport, WorkerConsumer};
use crate::error::PipelineError;
use crate::processor::{ChunkProcessor, SimulatedProcessor};
use crate::producer::{ProducerReport, StreamProducer};
use crate::reporter::report_loop;

/// A configured, not yet running pipeline.
pub struct Pipeline {
    config: Arc<SluiceConfig>,
    processor: Arc<dyn ChunkProcessor>,
}

impl Pipeline {
    /// Pipeline whose consumers run the simulated processor from `config`.
    pub fn new(config: SluiceConfig) -> Self {
        let processor = Arc::new(SimulatedProcessor::from_config(&config.processing));
        Self::with_processor(config, processor)
    }

    pub fn with_processor(config: SluiceConfig, processor: Arc<dyn ChunkProcessor>) -> Self {
        Self {
            config: Arc::new(config),
            processor,
        }
    }

    pub fn config(&self) -> &SluiceConfig {
        &self.config
    }

    /// Spawn all consumers, then all producers.
    ///
    /// Fails without spawning anything if the config is invalid or no
    /// runtime is available.
    pub fn start(&self) -> Result<RunningPipeline, PipelineError> {
        self.config.validate()?;
        let runtime = Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;

        let pipeline = &self.config.pipeline;
        let workers_count = task_count("pipeline.workers_count", pipeline.workers_count)?;
        let streams_count = task_count("pipeline.streams_count", pipeline.streams_count)?;
        let channel = Arc::new(BoundedChannel::new(pipeline.buffer_size));
        let metrics = Arc::new(Metrics::new(self.config.metrics.reservoir_size));
        let signal = ShutdownSignal::new();
        let high_latency = self.config.processing.high_latency_threshold();

        let consumers = (0..workers_count)
            .map(|worker_id| {
                let worker = WorkerConsumer::new(
                    worker_id,
                    channel.clone(),
                    metrics.clone(),
                    self.processor.clone(),
                    signal.subscribe(),
                )
                .with_high_latency_threshold(high_latency);
                runtime.spawn(worker.run())
            })
            .collect::<Vec<_>>();
        tracing::info!(count = consumers.len(), "workers started");

        let producers = (0..streams_count)
            .map(|stream_id| {
                let producer = StreamProducer::new(
                    stream_id,
                    pipeline,
                    channel.clone(),
                    metrics.clone(),
                    signal.subscribe(),
                );
                runtime.spawn(producer.run())
            })
            .collect::<Vec<_>>();
        tracing::info!(count = producers.len(), "streams started");

        let reporter = self.config.metrics.report_interval().map(|period| {
            runtime.spawn(report_loop(
                metrics.clone(),
                channel.clone(),
                period,
                signal.subscribe(),
            ))
        });

        Ok(RunningPipeline {
            producers,
            consumers,
            reporter,
            signal,
            channel,
            metrics,
        })
    }

    /// Start, wait for `trigger` to resolve, then shut down.
    pub async fn run_until<F>(&self, trigger: F) -> Result<RunReport, PipelineError>
    where
        F: Future<Output = ()>,
    {
        let running = self.start()?;
        trigger.await;
        tracing::info!("shutdown requested");
        running.shutdown().await
    }
}

/// Handle to a started pipeline. Dropping it without calling
/// [`RunningPipeline::shutdown`] leaves the tasks running detached.
pub struct RunningPipeline {
    producers: Vec<JoinHandle<ProducerReport>>,
    consumers: Vec<JoinHandle<ConsumerReport>>,
    reporter: Option<JoinHandle<()>>,
    signal: ShutdownSignal,
    channel: Arc<BoundedChannel>,
    metrics: Arc<Metrics>,
}

impl RunningPipeline {
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn channel(&self) -> &Arc<BoundedChannel> {
        &self.channel
    }

    /// A handle that can raise shutdown from elsewhere; `shutdown()` still
    /// has to be awaited to collect the tasks.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    /// True once every producer has returned, e.g. after reaching its chunk limit.
    pub fn producers_finished(&self) -> bool {
        self.producers.iter().all(|h| h.is_finished())
    }

    /// Raise the shutdown signal and wait for every task to return.
    ///
    /// All tasks are joined even if one failed; the first failure is then
    /// returned.
    pub async fn shutdown(self) -> Result<RunReport, PipelineError> {
        self.signal.trigger();

        let mut first_error = None;
        let mut streams = Vec::with_capacity(self.producers.len());
        for handle in self.producers {
            match handle.await {
                Ok(report) => streams.push(report),
                Err(e) => {
                    tracing::error!(error = %e, "stream task failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        let mut workers = Vec::with_capacity(self.consumers.len());
        for handle in self.consumers {
            match handle.await {
                Ok(report) => workers.push(report),
                Err(e) => {
                    tracing::error!(error = %e, "worker task failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(reporter) = self.reporter {
            if let Err(e) = reporter.await {
                tracing::warn!(error = %e, "reporter task failed");
            }
        }

        if let Some(e) = first_error {
            return Err(PipelineError::TaskFailed(e));
        }

        let report = RunReport {
            summary: self.metrics.summary(),
            generated: streams.iter().map(|s| s.generated).sum(),
            undelivered: self.channel.len(),
            streams,
            workers,
        };
        tracing::info!(
            processed = report.summary.processed,
            dropped = report.summary.dropped,
            generated = report.generated,
            undelivered = report.undelivered,
            "pipeline stopped"
        );
        Ok(report)
    }
}

/// Final state of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: Summary,
    /// Generation attempts across all streams.
    pub generated: u64,
    /// Chunks still queued at shutdown; neither processed nor dropped.
    pub undelivered: usize,
    pub streams: Vec<ProducerReport>,
    pub workers: Vec<ConsumerReport>,
}
