//! Tracing subscriber setup.
//!
//! Console output goes to stderr so command output on stdout stays clean.
//! When `logging.dir` is set, a daily rolling JSON log file is written as
//! well; the returned `LoggingGuard` must be held until exit so buffered
//! lines are flushed.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "leadboard.log";

/// Keeps the non-blocking file writer alive.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Filter directive for the config: `verbose` raises the default to debug.
fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose && config.filter == "info" {
        "debug".to_string()
    } else {
        config.filter.clone()
    }
}

/// `RUST_LOG` beats the configured filter.
fn build_filter(config: &LoggingConfig, verbose: bool) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => {
            let directive = filter_directive(config, verbose);
            EnvFilter::try_new(&directive)
                .with_context(|| format!("Invalid log filter '{}'", directive))
        }
    }
}

pub fn init_tracing(config: &LoggingConfig, verbose: bool) -> Result<LoggingGuard> {
    let filter = build_filter(config, verbose)?;

    let (file_layer, file_guard) = match &config.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let (json_layer, text_layer) = if config.json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (
            None,
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard { _file: file_guard })
}
