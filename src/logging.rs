//! Tracing setup. The terminal belongs to the table view, so logs go to a file.
//!
//! Filter priority: `RTV_LOG`, then `RUST_LOG`, then the `-v` count.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Level;
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::domain::TVError;

pub const LOG_ENV: &str = "RTV_LOG";
pub const DEFAULT_LOG_FILE: &str = "~/.rtv.log";

pub fn level_for(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Expand `~` and environment variables in a user supplied path.
pub fn expand_path(path: &str) -> Result<PathBuf, TVError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| TVError::Logging(format!("cannot expand {path}: {e}")))
}

pub fn init(log_file: &str, verbose: u8) -> Result<PathBuf, TVError> {
    let path = expand_path(log_file)?;
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let fmt_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(build_env_filter(verbose))
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| TVError::Logging(e.to_string()))?;
    Ok(path)
}

fn build_env_filter(verbose: u8) -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV)
        && let Ok(filter) = EnvFilter::try_new(&directives)
    {
        return filter;
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = level_for(verbose);
    EnvFilter::try_new(format!("{level},rtv={level}"))
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}
