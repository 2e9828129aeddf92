//! Configuration loading and resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`SHERPA_STUDIO_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Missing or unreadable config files degrade to defaults with a warning;
//! they never prevent startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default listen address for the dashboard
pub const DEFAULT_BIND: &str = "127.0.0.1:8701";
/// Default Sherpa server offered in the connect form
pub const DEFAULT_SERVER: &str = "https://sherpa-sandbox.example.com";
/// Default client-side request timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default text offered in the analyze box
pub const DEFAULT_TEXT: &str = "Sundar Pichai is the CEO of Google.";

/// Resolved dashboard configuration
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// Listen address, e.g. `127.0.0.1:8701`
    pub bind: String,
    /// Sherpa server URL pre-filled in the connect form
    pub default_server: String,
    /// Optional allow-list of project names to offer; `None` = all
    pub projects: Option<Vec<String>>,
    /// Optional restriction of annotator types to offer; `None` = all
    pub annotator_types: Option<Vec<String>>,
    /// Restrict annotator lists to user favorites
    pub favorite_only: bool,
    /// Text pre-filled in the analyze box
    pub default_text: String,
    /// Outbound HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            default_server: DEFAULT_SERVER.to_string(),
            projects: None,
            annotator_types: None,
            favorite_only: false,
            default_text: DEFAULT_TEXT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Command-line overrides, filled in by the binary's clap parser
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub server: Option<String>,
    pub config_file: Option<PathBuf>,
}

/// On-disk TOML schema; every field optional
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    pub bind: Option<String>,
    pub server: Option<String>,
    pub projects: Option<Vec<String>>,
    pub annotator_types: Option<Vec<String>>,
    pub favorite_only: Option<bool>,
    pub default_text: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl StudioConfig {
    /// Resolve the full configuration from CLI, environment, TOML and
    /// compiled defaults.
    pub fn resolve(cli: &CliOverrides) -> Self {
        let toml_config = match config_file_path(cli.config_file.as_deref()) {
            Some(path) => load_toml_config(&path).unwrap_or_else(|e| {
                warn!("Config file ignored ({}): {}", path.display(), e);
                TomlConfig::default()
            }),
            None => TomlConfig::default(),
        };

        let defaults = StudioConfig::default();

        Self {
            bind: cli
                .bind
                .clone()
                .or_else(|| std::env::var("SHERPA_STUDIO_BIND").ok())
                .or_else(|| toml_config.bind.clone())
                .unwrap_or(defaults.bind),
            default_server: cli
                .server
                .clone()
                .or_else(|| std::env::var("SHERPA_STUDIO_SERVER").ok())
                .or_else(|| toml_config.server.clone())
                .unwrap_or(defaults.default_server),
            projects: toml_config.projects,
            annotator_types: toml_config.annotator_types,
            favorite_only: std::env::var("SHERPA_STUDIO_FAVORITE_ONLY")
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .or(toml_config.favorite_only)
                .unwrap_or(defaults.favorite_only),
            default_text: toml_config.default_text.unwrap_or(defaults.default_text),
            timeout_secs: std::env::var("SHERPA_STUDIO_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(toml_config.timeout_secs)
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

/// Locate the config file: explicit path first, then the platform config
/// directory (`~/.config/sherpa-studio/config.toml` on Linux).
fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    dirs::config_dir()
        .map(|d| d.join("sherpa-studio").join("config.toml"))
        .filter(|p| p.exists())
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}
