//! In-memory store double for exercising the synchronizer

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use nyaya_core::chat::Message;
use nyaya_store::{
    MessageChanges, MessageRecord, NewMessage, SessionChanges, SessionRecord, SessionStore,
    StoreError, StoreResult,
};

pub(crate) fn unavailable() -> StoreError {
    StoreError::ApiError {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

pub(crate) fn bad_request() -> StoreError {
    StoreError::ApiError {
        status: 400,
        message: "bad request".to_string(),
    }
}

#[derive(Default)]
struct MemoryState {
    sessions: Vec<SessionRecord>,
    messages: Vec<MessageRecord>,
}

/// In-memory `SessionStore` with injectable failures
#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<MemoryState>,
    pub fail_sessions: AtomicBool,
    pub fail_messages: AtomicBool,
    pub fail_create_session: AtomicBool,
    pub fail_create_message: AtomicBool,
    pub fail_update_session: AtomicBool,
    pub fail_delete: AtomicBool,
    /// Fail with a 400 instead of a 503
    pub reject_create_message: AtomicBool,
    /// Fail this many `create_message` calls, then succeed
    pub create_message_failures: AtomicUsize,
    pub create_message_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn seed_session(&self, user_id: &str, title: &str) -> SessionRecord {
        self.seed_session_at(user_id, title, Utc::now())
    }

    pub fn seed_session_at(
        &self,
        user_id: &str,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> SessionRecord {
        let record = SessionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: updated_at,
            updated_at,
        };
        self.state.lock().unwrap().sessions.push(record.clone());
        record
    }

    pub fn seed_message(&self, session_id: &str, message: &Message) -> MessageRecord {
        let payload = NewMessage::from_message(session_id, message);
        let record = MessageRecord {
            id: payload.id,
            session_id: payload.session_id,
            sender: payload.sender,
            content: payload.content,
            timestamp: payload.timestamp,
            legal_references: payload.legal_references,
            action_steps: payload.action_steps,
            contact_info: payload.contact_info,
        };
        self.state.lock().unwrap().messages.push(record.clone());
        record
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    pub fn has_session(&self, id: &str) -> bool {
        self.state.lock().unwrap().sessions.iter().any(|s| s.id == id)
    }

    pub fn session_title(&self, id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.title.clone())
    }

    pub fn has_message(&self, id: &str) -> bool {
        self.state.lock().unwrap().messages.iter().any(|m| m.id == id)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn sessions_for_user(&self, user_id: &str) -> StoreResult<Vec<SessionRecord>> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let state = self.state.lock().unwrap();
        let mut sessions: Vec<SessionRecord> = state
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn create_session(&self, user_id: &str, title: &str) -> StoreResult<SessionRecord> {
        if self.fail_create_session.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let now = Utc::now();
        let record = SessionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().sessions.push(record.clone());
        Ok(record)
    }

    async fn update_session(
        &self,
        session_id: &str,
        changes: SessionChanges,
    ) -> StoreResult<SessionRecord> {
        if self.fail_update_session.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut state = self.state.lock().unwrap();
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| StoreError::ApiError {
                status: 404,
                message: format!("session {} not found", session_id),
            })?;
        if let Some(title) = changes.title {
            session.title = title;
        }
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    async fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut state = self.state.lock().unwrap();
        state.messages.retain(|m| m.session_id != session_id);
        state.sessions.retain(|s| s.id != session_id);
        Ok(())
    }

    async fn messages_for_session(&self, session_id: &str) -> StoreResult<Vec<MessageRecord>> {
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let state = self.state.lock().unwrap();
        let mut messages: Vec<MessageRecord> = state
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(messages)
    }

    async fn create_message(&self, message: NewMessage) -> StoreResult<MessageRecord> {
        self.create_message_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create_message.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        if self.reject_create_message.load(Ordering::SeqCst) {
            return Err(bad_request());
        }
        let remaining = self.create_message_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.create_message_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(unavailable());
        }
        let record = MessageRecord {
            id: message.id,
            session_id: message.session_id,
            sender: message.sender,
            content: message.content,
            timestamp: message.timestamp,
            legal_references: message.legal_references,
            action_steps: message.action_steps,
            contact_info: message.contact_info,
        };
        self.state.lock().unwrap().messages.push(record.clone());
        Ok(record)
    }

    async fn update_message(
        &self,
        message_id: &str,
        changes: MessageChanges,
    ) -> StoreResult<MessageRecord> {
        let mut state = self.state.lock().unwrap();
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| StoreError::ApiError {
                status: 404,
                message: format!("message {} not found", message_id),
            })?;
        if let Some(content) = changes.content {
            message.content = content;
        }
        if let Some(references) = changes.legal_references {
            message.legal_references = Some(references);
        }
        if let Some(steps) = changes.action_steps {
            message.action_steps = Some(steps);
        }
        if let Some(contacts) = changes.contact_info {
            message.contact_info = Some(contacts);
        }
        Ok(message.clone())
    }
}
