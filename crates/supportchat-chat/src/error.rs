//! Error types for the chat pipeline.

use supportchat_core::error::SupportError;

/// Errors from a chat turn or a document operation.
///
/// Provider failures never reach the HTTP layer as errors: the completion
/// client turns them into apology text. `Provider` exists for direct
/// provider calls such as model listing.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("sessionId is required")]
    MissingSessionId,
    #[error("Title and content are required")]
    InvalidDocument,
    #[error("retrieval error: {0}")]
    Retrieval(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<SupportError> for ChatError {
    fn from(err: SupportError) -> Self {
        match err {
            SupportError::Validation(_) => ChatError::InvalidDocument,
            SupportError::Provider(msg) => ChatError::Provider(msg),
            other => ChatError::Storage(other.to_string()),
        }
    }
}

impl ChatError {
    /// True for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ChatError::EmptyMessage | ChatError::MissingSessionId | ChatError::InvalidDocument
        )
    }
}
