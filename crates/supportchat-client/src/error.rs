//! Error types for the API client.

/// Errors from talking to the SupportChat server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport or body-decoding failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// True when the request never got a response from the server.
    ///
    /// A reply that arrived but failed to decode does not count.
    pub fn is_unreachable(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}
