use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::backend::{now_rfc3339, BackendClient, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// One entry of the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat message must not be empty")]
    EmptyMessage,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Assistant conversation about a submitted media directory.
pub struct ChatSession<B> {
    client: B,
    session_id: String,
    directory_path: String,
    messages: Vec<ChatMessage>,
}

impl<B: BackendClient> ChatSession<B> {
    /// Submit `directory` to the backend and start a transcript with its welcome.
    #[instrument(name = "chat_open", skip(client))]
    pub async fn open(client: B, directory: &Path) -> Result<Self, TransportError> {
        let directory_path = directory.display().to_string();
        let submission = client.submit_directory(&directory_path).await?;
        info!(session_id = %submission.session_id, "chat session opened");

        let mut session = Self {
            client,
            session_id: submission.session_id,
            directory_path: submission.directory_path,
            messages: Vec::new(),
        };
        session.push(MessageRole::Assistant, submission.message, now_rfc3339());
        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn directory_path(&self) -> &str {
        &self.directory_path
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send a user message and return the assistant's reply.
    ///
    /// The user message is kept even when the backend call fails, so the
    /// caller can retry.
    pub async fn send(&mut self, text: &str) -> Result<&ChatMessage, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.push(MessageRole::User, text.to_string(), now_rfc3339());

        let reply = self.client.chat(text, Some(&self.session_id)).await?;
        debug!(reply_len = reply.message.len(), "assistant replied");
        Ok(self.push(MessageRole::Assistant, reply.message, reply.timestamp))
    }

    fn push(&mut self, role: MessageRole, content: String, timestamp: String) -> &ChatMessage {
        let id = format!("msg-{}", self.messages.len() + 1);
        self.messages.push(ChatMessage {
            id,
            role,
            content,
            timestamp,
        });
        &self.messages[self.messages.len() - 1]
    }
}
