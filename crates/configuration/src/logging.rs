use crate::error::ConfigError;
use crate::settings::LoggingSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// flushes the non-blocking writer on drop and must be held for the lifetime
/// of the process. A log directory that cannot be created or written is a
/// [`ConfigError::LoggingError`].
pub fn init_tracing(settings: &LoggingSettings) -> Result<WorkerGuard, ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|e| ConfigError::LoggingError(format!("invalid level '{}': {}", settings.level, e)))?,
    };

    let (writer, guard) = match &settings.directory {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(settings.file_prefix.as_str())
                .build(dir)
                .map_err(|e| ConfigError::LoggingError(format!("log directory {}: {}", dir.display(), e)))?;
            tracing_appender::non_blocking(appender)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_ansi(settings.directory.is_none())
        .try_init()
        .map_err(|e| ConfigError::LoggingError(e.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_log_directory_is_an_error() {
        let settings = LoggingSettings {
            directory: Some("/proc/gridpilot/logs".into()),
            ..LoggingSettings::default()
        };
        assert!(matches!(init_tracing(&settings), Err(ConfigError::LoggingError(_))));
    }
}
