// Converter settings
// Loaded from <config dir>/ofdconv/config.toml

use std::fs;
use std::path::{Path, PathBuf};

use ofdconv_report::Flavor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_DIR_NAME: &str = "ofdconv";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_HIGHLIGHT: &str = "D3D3D3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid highlight_color \"{0}\" (expected 6 hex digits, e.g. D3D3D3)")]
    Color(String),

    #[error("cannot serialize settings: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Flavor tried first when `--flavor` is not given.
    pub default_flavor: Flavor,

    /// Parent directory for per-request scratch areas (system temp dir when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// Fill colour of daily and grand total rows, `RRGGBB` with optional `#`.
    pub highlight_color: String,

    /// Directory for result archives when `-o` is not given (working directory when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_flavor: Flavor::Checks,
            scratch_dir: None,
            highlight_color: DEFAULT_HIGHLIGHT.to_string(),
            output_dir: None,
        }
    }
}

impl Settings {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`. A missing file yields defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = Self::from_toml(&contents).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        log::debug!("settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        settings.highlight()?;
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Highlight colour as 0xRRGGBB.
    pub fn highlight(&self) -> Result<u32, ConfigError> {
        parse_hex_color(&self.highlight_color)
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

/// Parse `RRGGBB` or `#RRGGBB`.
pub fn parse_hex_color(value: &str) -> Result<u32, ConfigError> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::Color(value.to_string()));
    }
    u32::from_str_radix(hex, 16).map_err(|_| ConfigError::Color(value.to_string()))
}
