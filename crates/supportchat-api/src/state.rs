//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use supportchat_chat::{ChatOrchestrator, CompletionClient, CompletionProvider};
use supportchat_core::config::SupportConfig;
use supportchat_storage::{ChatRepository, Database, DocumentRepository};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (read-only after startup).
    pub config: Arc<SupportConfig>,
    /// Chat pipeline and document operations.
    pub chat: Arc<ChatOrchestrator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Wire repositories, the completion provider and the orchestrator.
    pub fn new(
        config: SupportConfig,
        database: Arc<Database>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        let documents = Arc::new(DocumentRepository::new(Arc::clone(&database)));
        let chats = Arc::new(ChatRepository::new(database));
        let completion = CompletionClient::new(provider);
        let chat = ChatOrchestrator::new(documents, chats, completion, &config);

        Self {
            config: Arc::new(config),
            chat: Arc::new(chat),
            start_time: Instant::now(),
        }
    }
}
