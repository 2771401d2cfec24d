//! Base trait for session stores

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nyaya_core::chat::{ActionStep, ContactInfo, LegalReference, Message, Sender};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StoreError {
    /// Whether a later retry could plausibly succeed
    pub fn retryable(&self) -> bool {
        match self {
            StoreError::HttpError(_) => true,
            StoreError::ApiError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A session row in the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message row in the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub legal_references: Option<Vec<LegalReference>>,
    #[serde(default)]
    pub action_steps: Option<Vec<ActionStep>>,
    #[serde(default)]
    pub contact_info: Option<Vec<ContactInfo>>,
}

impl MessageRecord {
    /// Convert a store row into the domain message type
    pub fn into_message(self) -> Message {
        Message {
            id: self.id,
            sender: self.sender,
            content: self.content,
            timestamp: self.timestamp,
            legal_references: self.legal_references.unwrap_or_default(),
            action_steps: self.action_steps.unwrap_or_default(),
            contact_info: self.contact_info.unwrap_or_default(),
        }
    }
}

/// Insert payload for a message
///
/// Id and timestamp are caller-supplied so local and remote identity match
/// and queued replays keep their original times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub id: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_references: Option<Vec<LegalReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_steps: Option<Vec<ActionStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<Vec<ContactInfo>>,
}

impl NewMessage {
    /// Build an insert payload from a domain message
    pub fn from_message(session_id: impl Into<String>, message: &Message) -> Self {
        fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
            if items.is_empty() {
                None
            } else {
                Some(items.to_vec())
            }
        }

        Self {
            id: message.id.clone(),
            session_id: session_id.into(),
            sender: message.sender,
            content: message.content.clone(),
            timestamp: message.timestamp,
            legal_references: non_empty(&message.legal_references),
            action_steps: non_empty(&message.action_steps),
            contact_info: non_empty(&message.contact_info),
        }
    }
}

/// Partial update for a session
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SessionChanges {
    /// Rename the session
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
        }
    }
}

/// Partial update for a message
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_references: Option<Vec<LegalReference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_steps: Option<Vec<ActionStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<Vec<ContactInfo>>,
}

/// Trait for remote session stores
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Sessions owned by a user, most recently updated first
    async fn sessions_for_user(&self, user_id: &str) -> StoreResult<Vec<SessionRecord>>;

    /// Create a session
    async fn create_session(&self, user_id: &str, title: &str) -> StoreResult<SessionRecord>;

    /// Update session fields; bumps `updated_at`
    async fn update_session(
        &self,
        session_id: &str,
        changes: SessionChanges,
    ) -> StoreResult<SessionRecord>;

    /// Delete a session and its messages
    async fn delete_session(&self, session_id: &str) -> StoreResult<()>;

    /// Messages of a session, oldest first
    async fn messages_for_session(&self, session_id: &str) -> StoreResult<Vec<MessageRecord>>;

    /// Insert a message
    async fn create_message(&self, message: NewMessage) -> StoreResult<MessageRecord>;

    /// Update message fields
    async fn update_message(
        &self,
        message_id: &str,
        changes: MessageChanges,
    ) -> StoreResult<MessageRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_omits_empty_metadata() {
        let message = Message::user("what is bail?");
        let payload = NewMessage::from_message("s-1", &message);
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["type"], "user");
        assert_eq!(value["session_id"], "s-1");
        assert!(value.get("legal_references").is_none());
        assert!(value.get("action_steps").is_none());
    }

    #[test]
    fn test_record_into_message_defaults_missing_metadata() {
        let json = r#"{
            "id": "m-1",
            "session_id": "s-1",
            "type": "ai",
            "content": "answer",
            "timestamp": "2025-02-10T08:30:00Z",
            "legal_references": null,
            "action_steps": null,
            "contact_info": null
        }"#;
        let record: MessageRecord = serde_json::from_str(json).unwrap();
        let message = record.into_message();
        assert_eq!(message.sender, Sender::Assistant);
        assert!(message.legal_references.is_empty());
        assert!(message.contact_info.is_empty());
    }

    #[test]
    fn test_retryable_classification() {
        let server_side = StoreError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        };
        let client_side = StoreError::ApiError {
            status: 400,
            message: "bad request".to_string(),
        };
        assert!(server_side.retryable());
        assert!(!client_side.retryable());
        assert!(StoreError::ApiError {
            status: 429,
            message: "slow down".to_string()
        }
        .retryable());
    }
}
