use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("element '#{id}' not found in document")]
    MissingElement { id: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response body was null")]
    NullResponse,
}

impl ClientError {
    pub fn missing(id: impl Into<String>) -> Self {
        Self::MissingElement { id: id.into() }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("network error: {0}")]
    Network(String),
}
