use anyhow::{Context, Result};
use chrono::Local;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const FILE_FILTER: &str = "minimanus=debug,minimanus_core=debug,info";

/// Console output at `info` (or `RUST_LOG`), plus a per-run DEBUG log file
/// under `log_dir` when given. Returns the log file path.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let console_level = if verbose { "debug" } else { "info" };
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "minimanus={0},minimanus_core={0},warn",
            console_level
        ))
    });

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(console_filter);

    let (file_layer, log_path) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let path = dir.join(format!("agent_{}.log", Local::now().format("%Y%m%d_%H%M%S")));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;

            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new(FILE_FILTER));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(log_path)
}
