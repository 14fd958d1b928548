//! Configuration loading
//!
//! Resolution order, lowest to highest precedence:
//! 1. built-in defaults
//! 2. JSON5 file (`$ADSCOPE_CONFIG_PATH`, else `<config dir>/adscope/config.json5`)
//! 3. environment variables (`AIRTABLE_TOKEN`, `AIRTABLE_BASE_ID`, ...)
//! 4. command-line flags, applied by the CLI layer
//!
//! Secrets are never compiled in; the bearer token must come from the
//! environment or the config file.

pub mod types;

pub use types::{AirtableSection, Config, MediaSection, ServerSection};

use crate::airtable::AirtableConfig;
use crate::media::DownloaderConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_PATH_ENV: &str = "ADSCOPE_CONFIG_PATH";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("missing {what}; {hint}")]
    Missing {
        what: &'static str,
        hint: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Resolved path of the config file (which need not exist).
pub fn get_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adscope")
        .join("config.json5")
}

/// Load from `path` and apply environment overrides.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let mut config = read_config_file(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Parse a config file; a missing file yields defaults.
pub fn read_config_file(path: &Path) -> Result<Config> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if raw.trim().is_empty() {
        return Ok(Config::default());
    }
    json5::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Overlay environment variables onto `config`. `lookup` is injected so
/// tests don't have to mutate the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty("AIRTABLE_TOKEN").or_else(|| non_empty("AIRTABLE_API_KEY")) {
        config.airtable.token = Some(token);
    }
    if let Some(base) = non_empty("AIRTABLE_BASE_ID") {
        config.airtable.base_id = Some(base);
    }
    if let Some(table) = non_empty("AIRTABLE_TABLE") {
        config.airtable.table = Some(table);
    }
    if let Some(url) = non_empty("AIRTABLE_API_URL") {
        config.airtable.api_url = url;
    }
    if let Some(program) = non_empty("ADSCOPE_DOWNLOADER") {
        config.media.downloader = program;
    }
    if let Some(level) = non_empty("ADSCOPE_LOG") {
        config.logging.level = level;
    }
}

impl Config {
    /// Client settings for the table service. Fails if no token is set.
    pub fn airtable_config(&self) -> Result<AirtableConfig> {
        let token = self
            .airtable
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing {
                what: "Airtable token",
                hint: "set AIRTABLE_TOKEN or airtable.token in the config file",
            })?;
        Ok(AirtableConfig::new(token)
            .with_api_url(self.airtable.api_url.clone())
            .with_timeout(Duration::from_secs(self.airtable.request_timeout_secs)))
    }

    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig {
            program: self.media.downloader.clone(),
            format: self.media.format.clone(),
            timeout: Duration::from_secs(self.media.timeout_secs),
        }
    }
}
