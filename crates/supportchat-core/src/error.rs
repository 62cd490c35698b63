use thiserror::Error;

/// Top-level error type for SupportChat.
///
/// Subsystem crates define their own error types and implement
/// `From<SupportError>` so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SupportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for SupportError {
    fn from(err: toml::de::Error) -> Self {
        SupportError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SupportError {
    fn from(err: toml::ser::Error) -> Self {
        SupportError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SupportError {
    fn from(err: serde_json::Error) -> Self {
        SupportError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for SupportChat operations.
pub type Result<T> = std::result::Result<T, SupportError>;
