use shared_types::AppError;

/// Failures while decoding a streaming response body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("response has no readable body")]
    StreamUnreadable,
    #[error("stream read failed: {0}")]
    Read(String),
    /// An error record sent in-band after the stream had started.
    #[error("{0}")]
    Upstream(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Api(#[from] AppError),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
