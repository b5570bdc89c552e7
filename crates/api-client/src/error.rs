use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("The API request returned status {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(": {detail}"),
        None => String::new(),
    }
}

impl ApiError {
    /// The backend's own explanation, when the response carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl From<core_types::CoreError> for ApiError {
    fn from(err: core_types::CoreError) -> Self {
        ApiError::Deserialization(err.to_string())
    }
}
