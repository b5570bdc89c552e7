use api_client::error::ApiError;
use events::Section;
use thiserror::Error;

use crate::config_form::ValidationError;

/// How a synchronisation or command failure is handled. None of these is
/// fatal: each is surfaced on the page and the dashboard keeps running.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A read failed. The last good data stays on screen until the next
    /// scheduled poll.
    #[error("Snapshot fetch failed: {0}")]
    TransientFetch(#[source] ApiError),

    /// Operator input was rejected before anything was sent.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{action} failed: {source}")]
    Command {
        action: &'static str,
        #[source]
        source: ApiError,
    },

    /// One of the initial loads failed. The other sections are unaffected.
    #[error("Failed to load {section}: {source}")]
    PartialLoad {
        section: Section,
        #[source]
        source: ApiError,
    },
}

impl SyncError {
    /// The backend's explanation, if the failure carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            SyncError::TransientFetch(source)
            | SyncError::Command { source, .. }
            | SyncError::PartialLoad { source, .. } => source.detail(),
            SyncError::Validation(_) => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] configuration::error::ConfigError),

    #[error("API client error: {0}")]
    ApiClient(#[from] ApiError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}
