//! Configuration system for exprquill.
//!
//! Settings are read from `~/.config/exprquill/config.toml`. Every field has
//! a default, so a partial file (or no file at all) is valid. Command-line
//! flags override what is loaded here.
//!
//! # Example
//!
//! ```
//! use exprquill::config::{Config, OutputFormat};
//!
//! let config = Config::default();
//! assert_eq!(config.output_format, OutputFormat::Pretty);
//! assert_eq!(config.log_level, "warn");
//!
//! let custom = Config {
//!     output_format: OutputFormat::Json,
//!     ..Config::default()
//! };
//! assert_eq!(custom.max_suggestions, 0);
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::expression::PruneFallback;

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Compact JSON, one document per line
    Json,
    /// Indented JSON
    #[default]
    Pretty,
    /// Human readable lines
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "pretty" => Ok(OutputFormat::Pretty),
            "text" => Ok(OutputFormat::Text),
            other => Err(format!(
                "unknown output format '{}', expected json, pretty or text",
                other
            )),
        }
    }
}

/// Configuration for the exprquill command line tool.
///
/// # Fields
///
/// * `output_format` - Result format: "json", "pretty" or "text" (default: "pretty")
/// * `log_level` - Default log filter when `RUST_LOG` is unset (default: "warn")
/// * `prune_fallback` - Suggestions shown when a typed key matches nothing:
///   "full-tree" or "empty" (default: "full-tree")
/// * `max_suggestions` - Cap on listed suggestions, 0 for no cap (default: 0)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output_format: OutputFormat,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub prune_fallback: PruneFallback,

    #[serde(default)]
    pub max_suggestions: usize,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            log_level: default_log_level(),
            prune_fallback: PruneFallback::default(),
            max_suggestions: 0,
        }
    }
}

impl Config {
    /// Returns the path to the config file.
    ///
    /// Uses `~/.config/exprquill/config.toml` on all platforms.
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|mut path| {
            path.push(".config");
            path.push("exprquill");
            path.push("config.toml");
            path
        })
    }

    /// Loads configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist or can't be
    /// parsed.
    pub fn load() -> Self {
        let Some(config_path) = Self::config_path() else {
            return Self::default();
        };
        if !config_path.exists() {
            return Self::default();
        }

        Self::load_from(&config_path).unwrap_or_else(|err| {
            warn!("ignoring config {}: {:#}", config_path.display(), err);
            Self::default()
        })
    }

    /// Loads configuration from an explicit file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Saves configuration to the default config file.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        self.save_to(config_path)
    }

    /// Saves configuration to an explicit file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Truncates a suggestion list to `max_suggestions`.
    pub fn limit<T>(&self, items: &mut Vec<T>) {
        if self.max_suggestions > 0 {
            items.truncate(self.max_suggestions);
        }
    }
}
