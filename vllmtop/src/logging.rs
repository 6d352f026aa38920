//! Tracing setup. The terminal belongs to the TUI, so logs go to a file in
//! the config dir; `VLLMTOP_LOG` takes an EnvFilter directive.

use std::{fs::OpenOptions, path::PathBuf, sync::Mutex};

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "VLLMTOP_LOG";

pub fn log_path() -> PathBuf {
    vllmtop::prefs::config_dir().join("vllmtop.log")
}

pub fn init() -> anyhow::Result<PathBuf> {
    let path = log_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("vllmtop=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;
    Ok(path)
}
