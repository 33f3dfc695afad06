use anyhow::Context;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Where log lines go.
#[derive(Debug, Clone)]
pub enum LogTarget {
    /// stderr with colours (CLI and server)
    Stderr,
    /// Append to a file without colours (terminal dashboard owns the screen)
    File(PathBuf),
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    tracing_subscriber::EnvFilter::new(log_level)
}

/// Install the global tracing subscriber. Call once per process.
pub fn initialize(target: LogTarget) -> anyhow::Result<()> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to install tracing subscriber")?;
        }
        LogTarget::File(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            }

            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;

            tracing_subscriber::registry()
                .with(env_filter())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::sync::Arc::new(log_file))
                        .with_ansi(false),
                )
                .try_init()
                .context("Failed to install tracing subscriber")?;
        }
    }

    Ok(())
}
