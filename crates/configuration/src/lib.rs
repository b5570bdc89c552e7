use crate::error::ConfigError;
use std::path::Path;
use tracing::debug;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{ApiSettings, Endpoints, LoggingSettings, PollingSettings, Settings};

/// The file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "gridpilot.toml";

/// Loads and validates the console settings.
///
/// Sources, lowest precedence first: built-in defaults, the TOML file (the
/// given path, which must exist, or an optional `gridpilot.toml`), then
/// `GRIDPILOT__SECTION__KEY` environment variables.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("GRIDPILOT")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;
    debug!(base_url = %settings.api.base_url, interval_ms = settings.polling.interval_ms, "Settings loaded");
    Ok(settings)
}

/// Parses settings from TOML text without touching the environment.
pub fn settings_from_toml(text: &str) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(text, config::FileFormat::Toml))
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = settings_from_toml("").unwrap();
        assert_eq!(settings.polling.interval_ms, 15_000);
        assert_eq!(settings.api.prefix, "/api");
        assert_eq!(settings.api.endpoints.orders, "/orders/");
        assert!(settings.api.token.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings = settings_from_toml(
            r#"
            [api]
            base_url = "https://bot.example.com"
            token = "secret"

            [api.endpoints]
            snapshot = "/dashboard/v2"

            [polling]
            interval_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(settings.api.base_url, "https://bot.example.com");
        assert_eq!(settings.api.token.as_deref(), Some("secret"));
        assert_eq!(settings.api.endpoints.snapshot, "/dashboard/v2");
        assert_eq!(settings.api.endpoints.status, "/status");
        assert_eq!(settings.api.timeout_secs, 10);
        assert_eq!(settings.polling.interval().as_millis(), 5000);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = settings_from_toml("[polling]\ninterval_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let err = settings_from_toml("[api]\nbase_url = \"ftp://example.com\"").unwrap_err();
        assert!(err.to_string().contains("http or https"));

        let err = settings_from_toml("[api]\nbase_url = \"not a url\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
