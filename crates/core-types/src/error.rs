use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid {what} payload: {reason}")]
    InvalidPayload { what: &'static str, reason: String },
}
