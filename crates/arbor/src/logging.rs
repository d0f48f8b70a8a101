//! Tracing setup. The TUI owns the terminal, so interactive sessions log to a
//! file under the cache directory; `--print` logs to stderr.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_ENV: &str = "ARBOR_LOG";

pub enum LogTarget {
    Stderr,
    File,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
}

pub fn log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("arbor").join("arbor.log"))
}

pub fn init(target: LogTarget) -> Result<()> {
    match target {
        LogTarget::Stderr => tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(filter())
            .try_init()
            .context("Failed to initialise logging")?,
        LogTarget::File => {
            let Some(path) = log_path() else {
                return Ok(());
            };
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = File::options()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .with(filter())
                .try_init()
                .context("Failed to initialise logging")?;
        }
    }
    Ok(())
}
