//! Typed configuration structures
//!
//! Every section has defaults, so an empty or missing file is a valid
//! configuration.

use crate::airtable::{DEFAULT_API_URL, MAX_PAGE_SIZE};
use crate::logging::LoggingConfig;
use crate::media::{DEFAULT_DOWNLOADER, DEFAULT_FORMAT, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub airtable: AirtableSection,
    pub media: MediaSection,
    pub logging: LoggingConfig,
    pub server: ServerSection,
}

/// Table service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AirtableSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub api_url: String,
    pub page_size: u32,
    pub request_timeout_secs: u64,
}

impl Default for AirtableSection {
    fn default() -> Self {
        Self {
            token: None,
            base_id: None,
            table: None,
            api_url: DEFAULT_API_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            request_timeout_secs: 30,
        }
    }
}

/// Downloader settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaSection {
    pub downloader: String,
    pub format: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            downloader: DEFAULT_DOWNLOADER.to_string(),
            format: DEFAULT_FORMAT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            output_dir: None,
        }
    }
}

/// Diagnostic tool server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub shell_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8811,
            shell_timeout_secs: 30,
        }
    }
}
