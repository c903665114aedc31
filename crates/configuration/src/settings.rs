use crate::error::ConfigError;
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::PathBuf;

/// Largest UTC offset any real time zone uses, in minutes.
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub analytics: AnalyticsSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub server: ServerSettings,
}

/// Contains parameters for the analytics engine.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSettings {
    /// Offset from UTC, in minutes, of the journal owner's local time.
    /// Decides which weekday a trade falls on and how chart dates are labelled.
    pub utc_offset_minutes: i32,
}

impl AnalyticsSettings {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ConfigError::ValidationError(format!(
                "analytics.utc_offset_minutes must be within ±{}, got {}",
                MAX_OFFSET_MINUTES, self.utc_offset_minutes
            )));
        }
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "invalid UTC offset: {} minutes",
                self.utc_offset_minutes
            ))
        })
    }
}

/// Output format of console log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LogFormat {
    Full,
    Compact,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive. `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// The connection URL for the PostgreSQL database. Falls back to `DATABASE_URL`.
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Checks invariants the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analytics.offset()?;
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::ValidationError("logging.level must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
