//! Assistant chat proxy with session-scoped history.
//!
//! History lifetime is coupled to the session explicitly: construction
//! registers a session-end hook that clears it on transition to anonymous,
//! instead of relying on incidental teardown ordering elsewhere.

use std::sync::{Arc, Mutex, PoisonError};

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single exchange entry in the local history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: String,
}

/// Proxies messages to the backend assistant endpoint and keeps the local
/// conversation history.
#[derive(Clone)]
pub struct ChatClient {
    api: ApiClient,
    history: Arc<Mutex<Vec<ChatMessage>>>,
}

impl ChatClient {
    /// Build a chat client whose history clears when the session ends.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let history = Arc::new(Mutex::new(Vec::new()));
        let cleared = Arc::clone(&history);
        api.session().on_session_end(move || {
            cleared.lock().unwrap_or_else(PoisonError::into_inner).clear();
        });
        Self { api, history }
    }

    /// Send a message to the assistant and record both sides of the exchange.
    ///
    /// # Errors
    ///
    /// [`ApiError::Api`] on backend rejection, transport/session errors
    /// otherwise. Failed sends record nothing.
    pub async fn send(&self, content: &str) -> Result<String, ApiError> {
        let reply: ChatReply = self
            .api
            .request_json(
                Method::POST,
                "/chat/message",
                Some(&serde_json::json!({ "message": content })),
            )
            .await?;

        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push(ChatMessage { role: ChatRole::User, content: content.to_owned() });
        history.push(ChatMessage { role: ChatRole::Assistant, content: reply.reply.clone() });
        Ok(reply.reply)
    }

    #[must_use]
    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
