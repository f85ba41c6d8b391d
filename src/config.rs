//! Client configuration: built-in defaults, an optional JSON config file, then CLI flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings the HTTP client is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("simpyl-cli/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Contents of `config.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub utc: Option<bool>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("simpyl-cli").join("config.json"))
}

/// Load the config file.
///
/// An explicitly given path must exist. The default location is optional and an
/// absent file yields an empty config.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(FileConfig::default()),
        },
    };
    if !required && !path.exists() {
        return Ok(FileConfig::default());
    }
    let data = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = serde_json::from_slice(&data).with_context(|| format!("parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(cfg)
}

impl ClientConfig {
    /// Layer file settings and CLI overrides over the defaults.
    pub fn resolve(file: &FileConfig, base_url: Option<&str>, timeout: Option<Duration>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: base_url
                .map(str::to_string)
                .or_else(|| file.base_url.clone())
                .unwrap_or(defaults.base_url),
            timeout: timeout.or(file.timeout).unwrap_or(defaults.timeout),
            user_agent: defaults.user_agent,
        }
    }
}
