use sluice_core::config::ConfigError;

/// Errors surfaced by the lifecycle controller. Per-chunk outcomes (drops,
/// processor failures) are counted in metrics and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Raised before any task is spawned.
    #[error("no async runtime available to spawn pipeline tasks")]
    NoRuntime,

    #[error("pipeline task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}
