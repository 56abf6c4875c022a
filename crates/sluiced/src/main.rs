//! sluiced — streaming ingestion simulator.
//!
//! Runs producers and consumers until SIGINT/SIGTERM, then prints the
//! final metrics summary to stdout.

use anyhow::{Context, Result};

use sluice_core::config::{OutputFormat, SluiceConfig};
use sluice_engine::{Pipeline, RunReport};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = SluiceConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        SluiceConfig::default()
    });
    let config_path = SluiceConfig::file_path();
    tracing::info!(path = %config_path.display(), "sluiced starting");

    print_config(&config);

    let pipeline = Pipeline::new(config);
    let report = pipeline
        .run_until(shutdown_signal())
        .await
        .context("pipeline did not shut down cleanly")?;

    print_report(&report, pipeline.config().output.format)?;
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }
}

fn print_config(config: &SluiceConfig) {
    let p = &config.pipeline;
    println!("── sluice configuration ─────────────────────────");
    println!("Workers:          {}", p.workers_count);
    println!("Streams:          {}", p.streams_count);
    println!("Stream interval:  0..={} ms", p.stream_interval_ms);
    println!("Chunk size:       0..={} bytes", p.chunk_size_bytes);
    println!("Buffer size:      {}", p.buffer_size);
    println!(
        "Processing delay: {}..={} ms",
        config.processing.min_delay_ms, config.processing.max_delay_ms
    );
    println!("Press Ctrl+C to stop.");
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("── final summary ────────────────────────────────");
            println!("{}", report.summary);
            println!("Generated:   {}", report.generated);
            if report.undelivered > 0 {
                println!("Undelivered: {}", report.undelivered);
            }
        }
        OutputFormat::Json => {
            let mut value = report.summary.to_json();
            if let Some(obj) = value.as_object_mut() {
                obj.insert("generated".into(), report.generated.into());
                obj.insert("undelivered".into(), report.undelivered.into());
            }
            let text = serde_json::to_string_pretty(&value).context("failed to render summary")?;
            println!("{text}");
        }
    }
    Ok(())
}
