//! Configuration management for assettag.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::sync::OnceLock;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::render::{EcLevel, QrFormat, QrOptions, Rgb, MAX_SIZE};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "assettag";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "assets.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "ASSETTAG_";

/// Largest accepted quiet zone, in modules.
const MAX_MARGIN: u32 = 16;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ASSETTAG_`, sections split on `__`)
/// 2. TOML config file at `~/.config/assettag/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application configuration.
    pub app: AppConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// QR rendering configuration.
    pub qr: QrConfig,
    /// Asset identifier configuration.
    pub assets: AssetsConfig,
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL asset deep links are built on.
    pub base_url: String,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/assettag/assets.db`
    pub database_path: Option<PathBuf>,
}

/// QR rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    /// Output width and height in pixels.
    pub size: u32,
    /// Quiet zone in modules.
    pub margin: u32,
    /// Module color as `#RRGGBB`.
    pub dark_color: String,
    /// Background color as `#RRGGBB`.
    pub light_color: String,
    /// Error-correction level: `L`, `M`, `Q` or `H`.
    pub error_correction: EcLevel,
    /// Output format: `png` or `svg`.
    pub format: QrFormat,
}

/// Asset identifier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Prefix for generated ids when no category prefix applies.
    pub id_prefix: String,
    /// Pattern asset ids given on the command line must match.
    pub id_pattern: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        let options = QrOptions::default();
        Self {
            size: options.size,
            margin: options.margin,
            dark_color: options.dark_color.to_hex(),
            light_color: options.light_color.to_hex(),
            error_correction: options.error_correction,
            format: QrFormat::default(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            id_prefix: "AST".to_string(),
            id_pattern: None,
        }
    }
}

impl QrConfig {
    /// Build renderer options from this section.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a color is malformed.
    pub fn options(&self) -> Result<QrOptions> {
        let color = |value: &str| {
            value
                .parse::<Rgb>()
                .map_err(|message| Error::ConfigValidation { message })
        };
        Ok(QrOptions {
            size: self.size,
            margin: self.margin,
            dark_color: color(&self.dark_color)?,
            light_color: color(&self.light_color)?,
            error_correction: self.error_correction,
        })
    }
}

fn color_regex() -> &'static Regex {
    static COLOR: OnceLock<Regex> = OnceLock::new();
    COLOR.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("Invalid regex pattern"))
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `ASSETTAG_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let base_url = &self.app.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::ConfigValidation {
                message: format!("base_url must start with http:// or https://: {base_url}"),
            });
        }

        if self.qr.size == 0 {
            return Err(Error::ConfigValidation {
                message: "qr.size must be greater than 0".to_string(),
            });
        }

        if self.qr.size > MAX_SIZE {
            return Err(Error::ConfigValidation {
                message: format!("qr.size ({}) cannot be greater than {MAX_SIZE}", self.qr.size),
            });
        }

        if self.qr.margin > MAX_MARGIN {
            return Err(Error::ConfigValidation {
                message: format!(
                    "qr.margin ({}) cannot be greater than {MAX_MARGIN}",
                    self.qr.margin
                ),
            });
        }

        for (field, value) in [
            ("dark_color", &self.qr.dark_color),
            ("light_color", &self.qr.light_color),
        ] {
            if !color_regex().is_match(value) {
                return Err(Error::ConfigValidation {
                    message: format!("qr.{field} must be #RRGGBB: {value}"),
                });
            }
        }

        if self.assets.id_prefix.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "assets.id_prefix cannot be empty".to_string(),
            });
        }

        self.id_regex()?;
        Ok(())
    }

    /// Compile the configured asset id pattern, if any.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the pattern does not compile.
    pub fn id_regex(&self) -> Result<Option<Regex>> {
        self.assets
            .id_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|_| Error::ConfigValidation {
                    message: format!("invalid regex pattern: {pattern}"),
                })
            })
            .transpose()
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}
