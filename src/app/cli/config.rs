//! TOML configuration file parsing and loading
//!
//! Precedence is CLI flags, then the config file, then built-in defaults.
//! A file named with `--config` must exist; the default location is used
//! only when present.

use crate::app::cli::args::{Args, ServeArgs};
use crate::core::validation::{require_positive, validate_bind_address, ValidationError};
use crate::queue::api::QueueSettings;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:7878";
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 300;
/// A day per party is the longest wait estimate step we accept
pub const MAX_MINUTES_PER_PARTY: u64 = 24 * 60;

/// `[logging]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<PathBuf>,
}

/// Effective daemon settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub bind: String,
    pub grace_period_secs: u64,
    pub max_party_size: u32,
    pub minutes_per_party: u64,
    pub logging: LoggingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let queue = QueueSettings::default();
        Self {
            bind: DEFAULT_BIND.to_string(),
            grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
            max_party_size: queue.max_party_size,
            minutes_per_party: queue.minutes_per_party,
            logging: LoggingConfig::default(),
        }
    }
}

/// `<config_dir>/Waitline/waitline.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Waitline").join("waitline.toml"))
}

impl ServiceConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ValidationError> {
        toml::from_str(contents)
            .map_err(|e| ValidationError::new(format!("Invalid configuration: {e}")))
    }

    /// Load the config file, if any
    ///
    /// `explicit` comes from `--config`; when absent the default location is
    /// tried and silently skipped if missing.
    pub async fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ValidationError> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ValidationError::new(format!(
                        "The specified configuration file does not exist: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => default_config_path().filter(|p| p.exists()),
        };

        let Some(path) = path else {
            return Ok((Self::default(), None));
        };

        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ValidationError::new(format!(
                "Error reading configuration file {}: {e}",
                path.display()
            ))
        })?;
        let config = Self::from_toml_str(&contents).map_err(|e| {
            ValidationError::new(format!("{} ({})", e.message(), path.display()))
        })?;

        log::debug!("Loaded configuration from {}", path.display());
        Ok((config, Some(path)))
    }

    /// Overlay command-line values on top of the file
    pub fn apply_args(&mut self, args: &Args) {
        let serve: &ServeArgs = args.command.serve_args();

        if let Some(bind) = &serve.bind {
            self.bind = bind.clone();
        }
        if let Some(secs) = serve.grace_secs {
            self.grace_period_secs = secs;
        }
        if let Some(max) = serve.max_party_size {
            self.max_party_size = max;
        }
        if let Some(minutes) = serve.minutes_per_party {
            self.minutes_per_party = minutes;
        }

        if let Some(level) = &args.log_level {
            self.logging.level = Some(level.clone());
        }
        if let Some(format) = &args.log_format {
            self.logging.format = Some(format.clone());
        }
        if args.log_file_disabled() {
            self.logging.file = None;
        } else if let Some(file) = &args.log_file {
            self.logging.file = Some(file.clone());
        }
    }

    /// Check every value before anything is started
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_bind_address(&self.bind)?;
        require_positive("grace_period_secs", self.grace_period_secs)?;
        require_positive("max_party_size", u64::from(self.max_party_size))?;
        if self.minutes_per_party > MAX_MINUTES_PER_PARTY {
            return Err(ValidationError::new(format!(
                "minutes_per_party must be at most {MAX_MINUTES_PER_PARTY}"
            )));
        }
        if let Some(format) = &self.logging.format {
            if !matches!(format.as_str(), "text" | "ext" | "json") {
                return Err(ValidationError::new(format!(
                    "Unknown log format '{format}' (expected text, ext or json)"
                )));
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ValidationError> {
        validate_bind_address(&self.bind)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            max_party_size: self.max_party_size,
            minutes_per_party: self.minutes_per_party,
        }
    }

    /// Render the effective settings as TOML
    pub fn to_toml_string(&self) -> Result<String, ValidationError> {
        toml::to_string_pretty(self)
            .map_err(|e| ValidationError::new(format!("Cannot render configuration: {e}")))
    }
}
