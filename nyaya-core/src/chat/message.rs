//! Message data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai")]
    Assistant,
}

impl Sender {
    pub fn is_user(&self) -> bool {
        matches!(self, Sender::User)
    }
}

/// A statutory reference cited in an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalReference {
    /// Act, article or section name
    pub section: String,
    pub description: String,
}

/// One recommended action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStep {
    /// Ordinal as text ("1", "2", ...)
    pub step: String,
    pub description: String,
}

/// Contact channel kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Phone,
    Email,
    Website,
}

/// An official helpline, office or portal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub department: String,
    /// Phone number, address or URL depending on `kind`
    pub helpline: String,
    #[serde(rename = "type")]
    pub kind: ContactKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legal_references: Vec<LegalReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action_steps: Vec<ActionStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact_info: Vec<ContactInfo>,
}

impl Message {
    /// Create a new message with a fresh id and timestamp
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            content: content.into(),
            timestamp: Utc::now(),
            legal_references: Vec::new(),
            action_steps: Vec::new(),
            contact_info: Vec::new(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, content)
    }

    /// Attach structured legal metadata
    pub fn with_metadata(
        mut self,
        legal_references: Vec<LegalReference>,
        action_steps: Vec<ActionStep>,
        contact_info: Vec<ContactInfo>,
    ) -> Self {
        self.legal_references = legal_references;
        self.action_steps = action_steps;
        self.contact_info = contact_info;
        self
    }
}
