//! Settings file (`config.toml`).
//!
//! Every field has a default, so a missing file or an empty one yields the
//! stock behavior.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::AppDescriptor;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package-manager executable name or path
    pub package_manager: String,
    pub download_timeout_minutes: u64,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Pause after a download is written, before it is executed
    pub filesystem_settle_ms: u64,
    /// Pause after an install finishes, before the artifact is deleted
    pub cleanup_delay_ms: u64,
    /// Where artifacts are staged; the system temp directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    /// Entries appended to the built-in catalog
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub apps: Vec<AppDescriptor>,
}

impl Config {
    pub const DEFAULT_PACKAGE_MANAGER: &'static str = "winget";
    pub const DEFAULT_DOWNLOAD_TIMEOUT_MINUTES: u64 = 10;
    pub const DEFAULT_MAX_REDIRECTS: usize = 10;
    pub const DEFAULT_FILESYSTEM_SETTLE_MS: u64 = 500;
    pub const DEFAULT_CLEANUP_DELAY_MS: u64 = 1000;
    pub const MAX_DOWNLOAD_TIMEOUT_MINUTES: u64 = 24 * 60;

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_minutes.saturating_mul(60))
    }

    pub fn filesystem_settle(&self) -> Duration {
        Duration::from_millis(self.filesystem_settle_ms)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package_manager: Self::DEFAULT_PACKAGE_MANAGER.to_string(),
            download_timeout_minutes: Self::DEFAULT_DOWNLOAD_TIMEOUT_MINUTES,
            max_redirects: Self::DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            filesystem_settle_ms: Self::DEFAULT_FILESYSTEM_SETTLE_MS,
            cleanup_delay_ms: Self::DEFAULT_CLEANUP_DELAY_MS,
            temp_dir: None,
            apps: Vec::new(),
        }
    }
}

/// Default settings file location.
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Unable to determine user config directory")?;
    Ok(config_dir.join("autoinstall").join("config.toml"))
}

/// Load settings from `path`, or from the default location when `None`.
/// A file that does not exist is not an error.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("parsing config file {}", path.display()))?;

    validate(&config).with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.package_manager.trim().is_empty() {
        anyhow::bail!("package_manager must not be empty");
    }
    if config.download_timeout_minutes == 0 {
        anyhow::bail!("download_timeout_minutes must be at least 1");
    }
    if config.download_timeout_minutes > Config::MAX_DOWNLOAD_TIMEOUT_MINUTES {
        anyhow::bail!(
            "download_timeout_minutes must be at most {}",
            Config::MAX_DOWNLOAD_TIMEOUT_MINUTES
        );
    }
    Ok(())
}
