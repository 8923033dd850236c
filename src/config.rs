//! Application configuration.
//!
//! Settings are layered with `figment`, later layers winning:
//!
//! 1. built-in defaults ([`Config::default`])
//! 2. a TOML file: `--config PATH`, or `fastdu/config.toml` in the platform
//!    config directory
//! 3. environment variables prefixed `FASTDU_` (e.g. `FASTDU_CONCURRENCY=8`)
//! 4. CLI flags, merged by the caller through [`Config::merge`]
//!
//! ```no_run
//! use fastdu::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("concurrency factor {}", config.concurrency);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::scanner::{SkipPatterns, WalkerConfig, DEFAULT_CONCURRENCY};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "FASTDU_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simultaneous directory listings.
    pub concurrency: usize,
    /// Traversal threads; 0 follows `concurrency`.
    pub threads: usize,
    /// Ranked listing length; negative lists everything.
    pub top: i64,
    /// Rank top-level totals instead of per-directory totals.
    pub summary: bool,
    /// Seconds between running-total reports; 0 disables them.
    pub print_interval_secs: u64,
    pub skip_patterns: Vec<String>,
    pub media_only: bool,
    pub report_dir: PathBuf,
    pub database: PathBuf,
    pub write_database: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            threads: 0,
            top: 10,
            summary: false,
            print_interval_secs: 0,
            skip_patterns: SkipPatterns::DEFAULT.iter().map(|s| (*s).to_string()).collect(),
            media_only: true,
            report_dir: PathBuf::from("."),
            database: PathBuf::from("media.db"),
            write_database: true,
        }
    }
}

impl Config {
    /// Defaults, file and environment layers.
    ///
    /// An explicit file must exist; the platform file is optional.
    #[must_use]
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match explicit {
            Some(path) => figment = figment.merge(Toml::file_exact(path)),
            None => {
                if let Some(path) = Self::default_path() {
                    figment = figment.merge(Toml::file(path));
                }
            }
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] for unreadable or malformed layers
    /// and [`ConfigError::Invalid`] for out-of-range values.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(explicit))
    }

    /// Extract and validate from a prepared figment.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Layer `overrides` (typically CLI flags) on top of this config.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn merge<T: Serialize>(self, overrides: T) -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::from(Serialized::defaults(self)).merge(Serialized::defaults(overrides)),
        )
    }

    /// Reject values the scanner cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        self.skip_set()?;
        Ok(())
    }

    fn skip_set(&self) -> Result<SkipPatterns, ConfigError> {
        SkipPatterns::new(&self.skip_patterns)
            .map_err(|e| ConfigError::Invalid(format!("skip_patterns: {e}")))
    }

    /// Walker settings derived from this config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a skip pattern does not compile.
    pub fn walker_config(&self) -> Result<WalkerConfig, ConfigError> {
        Ok(WalkerConfig::default()
            .with_concurrency(self.concurrency)
            .with_threads(self.threads)
            .with_media_only(self.media_only)
            .with_skip_patterns(self.skip_set()?))
    }

    #[must_use]
    pub fn print_interval(&self) -> Duration {
        Duration::from_secs(self.print_interval_secs)
    }

    /// Write this config as TOML to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Platform config file location, if a home directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "fastdu", "fastdu").map(|d| d.config_dir().join("config.toml"))
    }
}

/// Errors that can occur while loading or saving configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A layer could not be read or parsed
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// TOML serialization failed
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// I/O error while saving
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
