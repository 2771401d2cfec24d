//! Base trait for counsel providers

use async_trait::async_trait;
use futures::stream::{self, Stream};
use nyaya_core::chat::{ActionStep, ContactInfo, LegalReference};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

pub type CounselEventStream = Pin<Box<dyn Stream<Item = ProviderResult<CounselEvent>> + Send>>;

/// Role of a conversation turn sent to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

/// One prior turn of conversation context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: TurnRole,
    pub content: String,
}

impl HistoryTurn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    /// Create a model turn
    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            content: content.into(),
        }
    }
}

/// A base64-encoded inline attachment (one image per query)
#[derive(Debug, Clone)]
pub struct Attachment {
    pub mime_type: String,
    pub data: String,
}

impl Attachment {
    /// Encode raw bytes as an inline attachment
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }
}

/// A counsel request: the query plus its conversation context
#[derive(Debug, Clone)]
pub struct CounselRequest {
    pub query: String,
    pub turns: Vec<HistoryTurn>,
    pub attachment: Option<Attachment>,
    /// Model override; the provider default applies when absent
    pub model: Option<String>,
}

impl CounselRequest {
    /// Create a request with no history
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            turns: Vec::new(),
            attachment: None,
            model: None,
        }
    }

    /// Attach conversation history
    pub fn with_turns(mut self, turns: Vec<HistoryTurn>) -> Self {
        self.turns = turns;
        self
    }

    /// Attach an inline image
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Override the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// The decoded, structured answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounselReply {
    /// Answer text with marker blocks removed
    pub content: String,
    #[serde(default)]
    pub legal_references: Vec<LegalReference>,
    #[serde(default)]
    pub action_steps: Vec<ActionStep>,
    #[serde(default)]
    pub contact_info: Vec<ContactInfo>,
}

/// Streaming event emitted by counsel providers
#[derive(Debug, Clone)]
pub enum CounselEvent {
    /// Incremental answer text
    Delta(String),
    /// Final decoded reply
    Completed(CounselReply),
}

/// Trait for counsel providers
#[async_trait]
pub trait CounselProvider: Send + Sync {
    /// Answer a query with conversation context
    async fn counsel(&self, request: CounselRequest) -> ProviderResult<CounselReply>;

    /// Answer a query, streaming text as it is generated.
    ///
    /// Default behavior falls back to non-streaming counsel and emits one delta.
    async fn counsel_stream(&self, request: CounselRequest) -> ProviderResult<CounselEventStream> {
        let reply = self.counsel(request).await?;

        let mut events = Vec::new();
        if !reply.content.is_empty() {
            events.push(Ok(CounselEvent::Delta(reply.content.clone())));
        }
        events.push(Ok(CounselEvent::Completed(reply)));

        Ok(Box::pin(stream::iter(events)))
    }

    /// Get the default model for this provider
    fn default_model(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct CannedProvider;

    #[async_trait]
    impl CounselProvider for CannedProvider {
        async fn counsel(&self, _request: CounselRequest) -> ProviderResult<CounselReply> {
            Ok(CounselReply {
                content: "canned answer".to_string(),
                ..Default::default()
            })
        }

        fn default_model(&self) -> String {
            "canned".to_string()
        }
    }

    #[test]
    fn test_turn_role_wire_format() {
        assert_eq!(serde_json::to_string(&TurnRole::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&TurnRole::Model).unwrap(), "\"model\"");
    }

    #[test]
    fn test_attachment_encodes_base64() {
        let attachment = Attachment::from_bytes("image/png", b"abc");
        assert_eq!(attachment.data, "YWJj");
        assert_eq!(attachment.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_default_stream_falls_back_to_counsel() {
        let provider = CannedProvider;
        let mut stream = provider
            .counsel_stream(CounselRequest::new("q"))
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        match first {
            CounselEvent::Delta(text) => assert_eq!(text, "canned answer"),
            other => panic!("unexpected event: {:?}", other),
        }
        let second = stream.next().await.unwrap().unwrap();
        match second {
            CounselEvent::Completed(reply) => assert_eq!(reply.content, "canned answer"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(stream.next().await.is_none());
    }
}
