//! Chat orchestrator: runs one turn from user message to persisted reply.
//!
//! Also fronts the document store so the HTTP layer has a single entry
//! point for every operation.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use supportchat_core::config::SupportConfig;
use supportchat_core::types::{ChatSession, Document, Message, Role};
use supportchat_storage::{ChatRepository, DocumentRepository};

use crate::completion::CompletionClient;
use crate::error::ChatError;
use crate::locks::SessionLocks;
use crate::prompt::PromptAssembler;
use crate::retriever::ContextRetriever;

/// The assistant turn returned for a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub role: Role,
    pub content: String,
    /// Stored id of the session the turn was appended to.
    pub chat_id: String,
}

/// Central coordinator for chat turns and document operations.
pub struct ChatOrchestrator {
    documents: Arc<DocumentRepository>,
    chats: Arc<ChatRepository>,
    retriever: ContextRetriever,
    assembler: PromptAssembler,
    completion: CompletionClient,
    locks: SessionLocks,
}

impl ChatOrchestrator {
    pub fn new(
        documents: Arc<DocumentRepository>,
        chats: Arc<ChatRepository>,
        completion: CompletionClient,
        config: &SupportConfig,
    ) -> Self {
        let retriever = ContextRetriever::new(Arc::clone(&documents), &config.retrieval);
        let assembler = PromptAssembler::new(&config.prompt);

        Self {
            documents,
            chats,
            retriever,
            assembler,
            completion,
            locks: SessionLocks::new(),
        }
    }

    /// Answer `message` within `session_id` and persist both turns.
    ///
    /// Turns on the same session run one at a time. Retrieval or storage
    /// failures abort the turn with nothing written; provider failures
    /// produce a stored apology instead.
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ChatReply, ChatError> {
        if session_id.trim().is_empty() {
            return Err(ChatError::MissingSessionId);
        }
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let _guard = self.locks.acquire(session_id).await;

        let mut session = self
            .chats
            .find_by_session_id(session_id)?
            .unwrap_or_else(|| ChatSession::new(session_id));

        let docs = self.retriever.retrieve(message)?;
        let prompt = self.assembler.assemble(&docs, &session.messages, message);
        debug!(
            session_id,
            context_docs = docs.len(),
            history = prompt.history.len(),
            "Prompt assembled"
        );

        let reply = self.completion.complete(&prompt).await;

        session.updated_at = Utc::now();
        let chat_id = self.chats.append_messages(
            &session,
            &[Message::user(message), Message::assistant(reply.clone())],
        )?;

        info!(session_id, chat_id = %chat_id, "Chat turn stored");

        Ok(ChatReply {
            role: Role::Assistant,
            content: reply,
            chat_id,
        })
    }

    /// Load a session, creating an empty one on first access.
    pub fn get_or_create_session(&self, session_id: &str) -> Result<ChatSession, ChatError> {
        if session_id.trim().is_empty() {
            return Err(ChatError::MissingSessionId);
        }
        Ok(self.chats.get_or_create(session_id)?)
    }

    /// Store a new document. Both fields must be non-blank.
    pub fn create_document(&self, title: &str, content: &str) -> Result<Document, ChatError> {
        if title.trim().is_empty() || content.trim().is_empty() {
            return Err(ChatError::InvalidDocument);
        }
        let doc = Document::new(title, content);
        self.documents.save(&doc)?;
        info!(id = %doc.id, title = %doc.title, "Document created");
        Ok(doc)
    }

    /// All documents, newest first.
    pub fn list_documents(&self) -> Result<Vec<Document>, ChatError> {
        Ok(self.documents.list_newest_first()?)
    }

    /// Delete a document. Returns whether it existed.
    pub fn delete_document(&self, id: &str) -> Result<bool, ChatError> {
        let removed = self.documents.delete(id)?;
        info!(id, removed, "Document delete requested");
        Ok(removed)
    }

    pub fn document_count(&self) -> Result<u64, ChatError> {
        Ok(self.documents.count()?)
    }
}
