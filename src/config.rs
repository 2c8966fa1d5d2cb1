use anyhow::{Context, Result};
use std::path::PathBuf;

pub(crate) const DEFAULT_PAGE_SIZE: u32 = 10;
const DEFAULT_LOG_FILTER: &str = "warn";

/// Runtime settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Config {
    pub(crate) db_path: PathBuf,
    pub(crate) page_size: u32,
    pub(crate) log_filter: String,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `FINTRACK_DB`, `FINTRACK_PAGE_SIZE` and `FINTRACK_LOG` (falling back to
    /// `RUST_LOG`), each optional.
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let set = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let db_path = match set("FINTRACK_DB") {
            Some(path) => PathBuf::from(shellexpand(&path)),
            None => default_db_path()?,
        };

        let page_size = match set("FINTRACK_PAGE_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("FINTRACK_PAGE_SIZE must be a positive integer, got '{raw}'"))?,
            None => DEFAULT_PAGE_SIZE,
        };

        let log_filter = set("FINTRACK_LOG")
            .or_else(|| set("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            db_path,
            page_size,
            log_filter,
        })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "fintrack", "fintrack")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.join("fintrack.db"))
}

pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
