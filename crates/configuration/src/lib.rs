use crate::error::ConfigError;
use config::builder::{ConfigBuilder, DefaultState};
use config::{Environment, File};
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AnalyticsSettings, DatabaseSettings, LogFormat, LoggingSettings, ServerSettings, Settings,
};

/// Loads the application settings.
///
/// Sources are layered, later ones overriding earlier ones:
/// 1. Built-in defaults.
/// 2. The TOML file at `path`, or an optional `tradelog.toml` in the working directory.
/// 3. Environment variables such as `TRADELOG__SERVER__PORT=8080`.
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => File::from(path.to_path_buf()),
        None => File::with_name("tradelog").required(false),
    };

    let builder = defaults()?
        .add_source(file)
        .add_source(
            Environment::with_prefix("TRADELOG")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;
    tracing::debug!(
        utc_offset_minutes = settings.analytics.utc_offset_minutes,
        port = settings.server.port,
        "Configuration loaded."
    );

    Ok(settings)
}

/// A builder holding the default value of every setting.
fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(config::Config::builder()
        .set_default("analytics.utc_offset_minutes", 0)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "full")?
        .set_default("database.max_connections", 10)?
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000)?)
}
