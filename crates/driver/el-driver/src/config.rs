//! `elc.toml` configuration

use anyhow::{Context, Result};
use el_tac::DEFAULT_MAX_FIELD_LEN;
use el_tac_lower::DEFAULT_ENTRY;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name looked up when no explicit config path is given
pub const CONFIG_FILE: &str = "elc.toml";

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElcConfig {
    /// Name of the block treated as the program entry
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Byte limit for one serialized operand
    #[serde(default = "default_max_field_len")]
    pub max_field_len: usize,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[output]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// How results are printed
    #[serde(default)]
    pub format: OutputFormat,

    /// Default destination for `elc export`
    #[serde(default)]
    pub tac_file: Option<PathBuf>,

    /// Where `elc symbols` also writes the dump
    #[serde(default)]
    pub symbols_file: Option<PathBuf>,
}

/// Printed output style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable listing
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format `{other}` (expected `text` or `json`)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

fn default_entry() -> String {
    DEFAULT_ENTRY.to_string()
}

fn default_max_field_len() -> usize {
    DEFAULT_MAX_FIELD_LEN
}

impl Default for ElcConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            max_field_len: default_max_field_len(),
            output: OutputConfig::default(),
        }
    }
}

impl ElcConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise `elc.toml` from `dir` when present.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let default_path = dir.join(CONFIG_FILE);
        if default_path.is_file() {
            Self::from_file(&default_path)
        } else {
            tracing::debug!(path = %default_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Checks values that deserialization alone cannot rule out.
    ///
    /// Callers that override fields after loading must validate again.
    pub fn validate(&self) -> Result<()> {
        if self.entry.trim().is_empty() {
            anyhow::bail!("`entry` must name a block");
        }
        if self.max_field_len == 0 {
            anyhow::bail!("`max_field_len` must be at least 1");
        }
        Ok(())
    }
}
