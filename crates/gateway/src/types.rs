use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ConversationId, MessageId};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

/// One entry of `GET /conversations`.
///
/// Timestamps stay opaque strings: the backend owns them and does not promise a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: ConversationId,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One entry of `GET /conversations/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub content: String,
    pub sender: Sender,
    pub timestamp: String,
}

impl MessageRecord {
    /// Builds a client-stamped user message carrying a placeholder id.
    pub fn optimistic_user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::placeholder(),
            content: content.into(),
            sender: Sender::User,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.id.is_placeholder()
    }
}

/// Body of `POST /agent`. A `None` conversation asks the backend to create one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendRequest {
    pub message: String,
    pub conversation_id: Option<ConversationId>,
}

impl SendRequest {
    pub fn new(message: impl Into<String>, conversation_id: Option<ConversationId>) -> Self {
        Self {
            message: message.into(),
            conversation_id,
        }
    }
}

/// Response of `POST /agent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub response: Option<String>,
}

/// Body of `PATCH /conversations/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Response of `GET /chat/{id}`, the read side of a share link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedChat {
    pub conversation: ConversationRecord,
    pub messages: Vec<MessageRecord>,
}
