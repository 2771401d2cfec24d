//! PostgREST-style REST store client (Supabase-compatible)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::base::{
    MessageChanges, MessageRecord, NewMessage, SessionChanges, SessionRecord, SessionStore,
    StoreError, StoreResult,
};
use nyaya_core::config::StoreConfig;

const SESSIONS_TABLE: &str = "chat_sessions";
const MESSAGES_TABLE: &str = "chat_messages";

/// Insert payload for a session row
#[derive(Debug, Serialize)]
struct NewSessionBody<'a> {
    user_id: &'a str,
    title: &'a str,
}

/// Patch payload for a session row
#[derive(Debug, Serialize)]
struct SessionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    updated_at: DateTime<Utc>,
}

/// REST client for a PostgREST-style backend
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    /// Create a new REST store client
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create a client from configuration
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        if config.url.trim().is_empty() {
            return Err(StoreError::ConfigError("store.url is not set".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(StoreError::ConfigError(
                "store.api_key is not set".to_string(),
            ));
        }
        Ok(Self::new(config.url.clone(), config.api_key.clone()))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn apply_headers(&self, req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req_builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn ensure_success(response: reqwest::Response) -> StoreResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StoreError::ApiError { status, message })
    }

    /// POST an insert and decode the affected row
    async fn insert_one<B, T>(&self, table: &str, body: &B) -> StoreResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req_builder = self
            .apply_headers(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .json(body);
        let response = Self::ensure_success(req_builder.send().await?).await?;
        Ok(response.json().await?)
    }

    /// PATCH a single row by id and decode the affected row
    async fn patch_one<B, T>(&self, table: &str, id: &str, body: &B) -> StoreResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req_builder = self
            .apply_headers(self.client.patch(self.table_url(table)))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .json(body);
        let response = Self::ensure_success(req_builder.send().await?).await?;
        Ok(response.json().await?)
    }

    /// DELETE rows matching a filter
    async fn delete_where(&self, table: &str, column: &str, id: &str) -> StoreResult<()> {
        let req_builder = self
            .apply_headers(self.client.delete(self.table_url(table)))
            .query(&[(column, format!("eq.{}", id))]);
        Self::ensure_success(req_builder.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RestStore {
    async fn sessions_for_user(&self, user_id: &str) -> StoreResult<Vec<SessionRecord>> {
        debug!("Fetching sessions for user {}", user_id);
        let req_builder = self
            .apply_headers(self.client.get(self.table_url(SESSIONS_TABLE)))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "updated_at.desc".to_string()),
            ]);
        let response = Self::ensure_success(req_builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn create_session(&self, user_id: &str, title: &str) -> StoreResult<SessionRecord> {
        debug!("Creating session '{}' for user {}", title, user_id);
        self.insert_one(SESSIONS_TABLE, &NewSessionBody { user_id, title })
            .await
    }

    async fn update_session(
        &self,
        session_id: &str,
        changes: SessionChanges,
    ) -> StoreResult<SessionRecord> {
        debug!("Updating session {}", session_id);
        let patch = SessionPatch {
            title: changes.title,
            updated_at: Utc::now(),
        };
        self.patch_one(SESSIONS_TABLE, session_id, &patch).await
    }

    async fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        debug!("Deleting session {} and its messages", session_id);
        // Messages first so a failed session delete never orphans them
        self.delete_where(MESSAGES_TABLE, "session_id", session_id)
            .await?;
        self.delete_where(SESSIONS_TABLE, "id", session_id).await
    }

    async fn messages_for_session(&self, session_id: &str) -> StoreResult<Vec<MessageRecord>> {
        debug!("Fetching messages for session {}", session_id);
        let req_builder = self
            .apply_headers(self.client.get(self.table_url(MESSAGES_TABLE)))
            .query(&[
                ("select", "*".to_string()),
                ("session_id", format!("eq.{}", session_id)),
                ("order", "timestamp.asc".to_string()),
            ]);
        let response = Self::ensure_success(req_builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn create_message(&self, message: NewMessage) -> StoreResult<MessageRecord> {
        debug!(
            "Creating message {} in session {}",
            message.id, message.session_id
        );
        self.insert_one(MESSAGES_TABLE, &message).await
    }

    async fn update_message(
        &self,
        message_id: &str,
        changes: MessageChanges,
    ) -> StoreResult<MessageRecord> {
        debug!("Updating message {}", message_id);
        self.patch_one(MESSAGES_TABLE, message_id, &changes).await
    }
}
