//! Configuration file parsing for the CLI.
//!
//! A TOML file with serde defaults for every field, loaded once at
//! startup and overridable by CLI flags.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level CLI configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Output format: "text" or "json".
    #[serde(default = "default_format")]
    pub format: String,

    /// Where to write a saved schema snapshot after a successful plan,
    /// if set (handy for `--from` on the next run).
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            snapshot_path: None,
        }
    }
}

fn default_format() -> String {
    "text".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_text_output() {
        let config = Config::default();
        assert_eq!(config.output.format, "text");
    }

    #[test]
    fn test_parses_explicit_format() {
        let config: Config = toml::from_str("[output]\nformat = \"json\"\n").unwrap();
        assert_eq!(config.output.format, "json");
    }
}
