//! Conversation state for one chat widget.

use tracing::{error, warn};

use supportchat_core::types::Message;

use crate::api::ApiClient;
use crate::error::ClientError;

/// Shown as the assistant turn when the server cannot be reached.
pub const UNREACHABLE_REPLY: &str = "Error: Could not reach the server.";

/// Messages of one session plus the in-flight flag.
#[derive(Debug)]
pub struct ChatStore {
    client: ApiClient,
    session_id: String,
    messages: Vec<Message>,
    is_loading: bool,
}

impl ChatStore {
    pub fn new(client: ApiClient, session_id: impl Into<String>) -> Self {
        Self {
            client,
            session_id: session_id.into(),
            messages: Vec::new(),
            is_loading: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Replace local messages with the server's transcript.
    ///
    /// On failure the local state is left as it was.
    pub async fn load_history(&mut self) -> Result<(), ClientError> {
        match self.client.load_chat(&self.session_id).await {
            Ok(session) => {
                self.messages = session.messages;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to load history");
                Err(e)
            }
        }
    }

    /// Send `content` and append the reply.
    ///
    /// The user turn is shown immediately. Any failure to get a reply
    /// appends an assistant turn describing it, so the transcript always
    /// ends with an answer. Blank input is ignored and returns `None`.
    pub async fn send_message(&mut self, content: &str) -> Option<&Message> {
        if content.trim().is_empty() {
            return None;
        }

        self.messages.push(Message::user(content));
        self.is_loading = true;

        let reply = match self.client.send_message(&self.session_id, content).await {
            Ok(reply) => reply.content,
            Err(e) if e.is_unreachable() => {
                warn!(error = %e, "Chat request failed");
                UNREACHABLE_REPLY.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Chat request rejected");
                format!("Error: {}", e)
            }
        };

        self.messages.push(Message::assistant(reply));
        self.is_loading = false;
        self.messages.last()
    }
}
