use thiserror::Error;

/// Errors surfaced by backend calls, media handling and local persistence.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("Server error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid or empty image URL received")]
    InvalidImageUrl,

    #[error("{0} is not a displayable image")]
    NotAnImage(String),

    /// The owning page unmounted before the call finished.
    #[error("request aborted")]
    Cancelled,

    #[error("invalid credential: {0}")]
    Credential(#[from] jsonwebtoken::errors::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("audio device error: {0}")]
    Audio(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
