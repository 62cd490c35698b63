//! Chat pipeline for SupportChat.
//!
//! Keyword retrieval over stored documents, prompt assembly, the completion
//! client with its soft-failure policy, per-session write locks, and the
//! orchestrator that ties one chat turn together.

pub mod completion;
pub mod error;
pub mod locks;
pub mod orchestrator;
pub mod prompt;
pub mod retriever;

pub use completion::{
    fallback_text, CompletionClient, CompletionProvider, GeminiProvider, MockCompletion, ModelInfo,
};
pub use error::ChatError;
pub use locks::{SessionGuard, SessionLocks};
pub use orchestrator::{ChatOrchestrator, ChatReply};
pub use prompt::{AssembledPrompt, PromptAssembler, ProviderRole, ProviderTurn};
pub use retriever::{extract_keywords, ContextRetriever};
