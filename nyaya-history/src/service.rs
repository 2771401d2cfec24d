//! The history synchronization service
//!
//! `ChatHistory` owns the optimistic in-memory state and keeps the
//! remote store in step with it. Local updates are applied first and
//! never rolled back; remote writes retry with linear backoff and fall
//! into the persisted pending queue when they exhaust their attempts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use nyaya_core::chat::{
    derive_title, ActionStep, ContactInfo, LegalReference, Message, Sender, Session, DEFAULT_TITLE,
};
use nyaya_core::config::HistoryConfig;
use nyaya_store::{NewMessage, SessionChanges, SessionRecord, SessionStore};

use crate::error::{HistoryError, HistoryResult};
use crate::migrate::{run_migration, MigrationReport};
use crate::vault::{LocalVault, PendingMessage};

/// Assistant greeting seeded into every new session
pub const GREETING: &str = "Namaste! I am your AI Legal Assistant, here to help you navigate the Indian legal system. I can assist you with understanding laws, rights, procedures, and legal documentation. How may I assist you today?";

/// Retry behavior for remote writes
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per persistence cycle
    pub max_attempts: u32,
    /// Attempt n waits `base_delay * n` before the next try
    pub base_delay: Duration,
    /// Period of the background retry task
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            interval: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self {
            max_attempts: config.max_save_attempts,
            base_delay: Duration::from_secs(config.retry_base_secs),
            interval: Duration::from_secs(config.retry_interval_secs),
        }
    }
}

/// Where the loaded state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// The remote store answered
    Remote,
    /// Remote unreachable, legacy local archive used
    LocalArchive,
    /// Remote unreachable and nothing usable locally
    Empty,
}

/// Outcome of a `load`
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub source: LoadSource,
    /// Sessions in memory after the load
    pub sessions: usize,
    /// Set when the one-time migration ran during this load
    pub migrated: Option<MigrationReport>,
    /// Duplicate sessions removed
    pub deduped: usize,
    /// Queued messages persisted during replay
    pub replayed: usize,
}

/// Outcome of a retry pass over failed messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// A message to append, before id and timestamp are minted
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub sender: Sender,
    pub content: String,
    pub legal_references: Vec<LegalReference>,
    pub action_steps: Vec<ActionStep>,
    pub contact_info: Vec<ContactInfo>,
}

impl MessageDraft {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
            legal_references: Vec::new(),
            action_steps: Vec::new(),
            contact_info: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            content: content.into(),
            legal_references: Vec::new(),
            action_steps: Vec::new(),
            contact_info: Vec::new(),
        }
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

    fn into_message(self) -> Message {
        Message::new(self.sender, self.content).with_metadata(
            self.legal_references,
            self.action_steps,
            self.contact_info,
        )
    }
}

#[derive(Default)]
struct HistoryState {
    /// Sessions, most recently updated first
    sessions: Vec<Session>,
    current: Option<String>,
    /// Message ids with a persistence cycle in flight
    saving: HashSet<String>,
    /// Message ids whose persistence cycle exhausted its attempts
    failed: HashSet<String>,
}

/// Synchronizes chat state between memory, the vault and the remote store
#[derive(Clone)]
pub struct ChatHistory {
    store: Arc<dyn SessionStore>,
    vault: LocalVault,
    user_id: String,
    policy: RetryPolicy,
    state: Arc<RwLock<HistoryState>>,
    running: Arc<RwLock<bool>>,
    task: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl ChatHistory {
    pub fn new(
        store: Arc<dyn SessionStore>,
        vault: LocalVault,
        user_id: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            vault,
            user_id: user_id.into(),
            policy,
            state: Arc::new(RwLock::new(HistoryState::default())),
            running: Arc::new(RwLock::new(false)),
            task: Arc::new(RwLock::new(None)),
        }
    }

    /// Load state: migrate, fetch, dedupe, restore the current session
    /// and replay the pending queue.
    ///
    /// A remote failure degrades to the legacy archive (before migration)
    /// or an empty list (after); only an unusable data directory is a
    /// hard error.
    pub async fn load(&self) -> HistoryResult<LoadReport> {
        self.vault.ensure_dir()?;

        let migrated = match run_migration(self.store.as_ref(), &self.vault, &self.user_id).await {
            Ok(report) => report,
            Err(HistoryError::Store(err)) => {
                warn!("Migration deferred, remote store unreachable: {}", err);
                return self.load_fallback(None).await;
            }
            Err(err) => return Err(err),
        };

        let records = match self.store.sessions_for_user(&self.user_id).await {
            Ok(records) => records,
            Err(err) => {
                warn!("Failed to fetch sessions, using local data: {}", err);
                return self.load_fallback(migrated).await;
            }
        };

        let (records, deduped) = if records.len() > 1 {
            self.dedupe_sessions(records).await
        } else {
            (records, 0)
        };

        let mut sessions = Vec::with_capacity(records.len());
        for record in records {
            let rows = match self.store.messages_for_session(&record.id).await {
                Ok(rows) => rows,
                Err(err) => {
                    warn!("Failed to fetch messages, using local data: {}", err);
                    return self.load_fallback(migrated).await;
                }
            };
            sessions.push(Session {
                id: record.id,
                title: record.title,
                messages: rows.into_iter().map(|row| row.into_message()).collect(),
                created_at: record.created_at,
                updated_at: record.updated_at,
            });
        }

        self.install_state(sessions).await;

        let mut report = LoadReport {
            source: LoadSource::Remote,
            sessions: 0,
            migrated,
            deduped,
            replayed: 0,
        };

        if self.state.read().await.sessions.is_empty() {
            self.create_session().await?;
        }

        report.replayed = self.replay_pending().await;
        report.sessions = self.state.read().await.sessions.len();
        info!(
            "Loaded {} session(s) from the remote store ({} replayed)",
            report.sessions, report.replayed
        );
        Ok(report)
    }

    /// Degraded load when the remote store is unreachable. The archive is
    /// only trusted before migration completes; afterwards the remote copy
    /// is authoritative and we start empty. Pending replay is skipped.
    async fn load_fallback(&self, migrated: Option<MigrationReport>) -> HistoryResult<LoadReport> {
        let (mut sessions, source) = if self.vault.migration_completed() {
            (Vec::new(), LoadSource::Empty)
        } else {
            let archive = self.vault.load_archive();
            if archive.is_empty() {
                (Vec::new(), LoadSource::Empty)
            } else {
                (archive, LoadSource::LocalArchive)
            }
        };
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        self.install_state(sessions).await;

        if self.state.read().await.sessions.is_empty() {
            self.create_session().await?;
        }

        let count = self.state.read().await.sessions.len();
        info!("Loaded {} session(s) from local fallback", count);
        Ok(LoadReport {
            source,
            sessions: count,
            migrated,
            deduped: 0,
            replayed: 0,
        })
    }

    /// Replace in-memory state and restore the current-session marker
    async fn install_state(&self, sessions: Vec<Session>) {
        let current = self
            .vault
            .current_session()
            .filter(|id| sessions.iter().any(|s| s.id == *id))
            .or_else(|| sessions.first().map(|s| s.id.clone()));

        {
            let mut state = self.state.write().await;
            state.sessions = sessions;
            state.current = current.clone();
            state.saving.clear();
            state.failed.clear();
        }

        if let Some(id) = &current {
            if let Err(err) = self.vault.set_current_session(id) {
                warn!("Failed to persist current-session marker: {}", err);
            }
        }
    }

    /// Collapse sessions that share an exact title, keeping the most
    /// recently updated one. Deletions are best-effort; survivors are
    /// re-fetched so ordering reflects the store.
    async fn dedupe_sessions(&self, records: Vec<SessionRecord>) -> (Vec<SessionRecord>, usize) {
        let mut groups: HashMap<String, Vec<SessionRecord>> = HashMap::new();
        for record in records {
            groups.entry(record.title.clone()).or_default().push(record);
        }

        let mut doomed = Vec::new();
        for group in groups.values_mut() {
            if group.len() < 2 {
                continue;
            }
            group.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            doomed.extend(group.split_off(1));
        }

        let survivors = || {
            let mut survivors: Vec<SessionRecord> = groups.values().flatten().cloned().collect();
            survivors.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            survivors
        };

        if doomed.is_empty() {
            return (survivors(), 0);
        }

        let mut deleted = 0;
        for record in &doomed {
            match self.store.delete_session(&record.id).await {
                Ok(()) => deleted += 1,
                Err(err) => {
                    warn!("Failed to delete duplicate session {}: {}", record.id, err);
                }
            }
        }
        info!("Removed {} duplicate session(s)", deleted);

        match self.store.sessions_for_user(&self.user_id).await {
            Ok(records) => (records, deleted),
            Err(err) => {
                warn!("Failed to re-fetch sessions after dedupe: {}", err);
                (survivors(), deleted)
            }
        }
    }

    /// Create a new session, seed the greeting and make it current.
    ///
    /// Falls back to a local-only session when the remote create fails so
    /// the product stays usable offline.
    pub async fn create_session(&self) -> HistoryResult<String> {
        let greeting = Message::assistant(GREETING);

        let session = match self.store.create_session(&self.user_id, DEFAULT_TITLE).await {
            Ok(record) => {
                let payload = NewMessage::from_message(&record.id, &greeting);
                if let Err(err) = self.store.create_message(payload).await {
                    warn!("Failed to seed greeting remotely: {}", err);
                }
                let mut session = Session::new(record.id, record.title);
                session.created_at = record.created_at;
                session.push(greeting);
                session
            }
            Err(err) => {
                warn!(
                    "Failed to create session remotely, using a local session: {}",
                    err
                );
                let mut session = Session::new(uuid::Uuid::new_v4().to_string(), DEFAULT_TITLE);
                session.push(greeting);
                session
            }
        };

        let id = session.id.clone();
        {
            let mut state = self.state.write().await;
            state.sessions.insert(0, session);
            state.current = Some(id.clone());
        }
        if let Err(err) = self.vault.set_current_session(&id) {
            warn!("Failed to persist current-session marker: {}", err);
        }
        info!("Created session {}", id);
        Ok(id)
    }

    /// Append a message to the current session and persist it remotely.
    ///
    /// The local append happens first and is never rolled back. When the
    /// session still has the default title and the sender is the user,
    /// the title is derived from the content and the rename rides along
    /// with the persistence cycle.
    pub async fn append_to_current(&self, draft: MessageDraft) -> HistoryResult<String> {
        let message = draft.into_message();
        let message_id = message.id.clone();

        let (session_id, new_title) = {
            let mut state = self.state.write().await;
            let current_id = state.current.clone().ok_or(HistoryError::NoCurrentSession)?;
            let new_title;
            {
                let session = state
                    .sessions
                    .iter_mut()
                    .find(|s| s.id == current_id)
                    .ok_or_else(|| HistoryError::SessionNotFound(current_id.clone()))?;
                new_title = if session.title == DEFAULT_TITLE && message.sender.is_user() {
                    let title = derive_title(&message.content);
                    session.title = title.clone();
                    Some(title)
                } else {
                    None
                };
                session.push(message.clone());
            }
            state.saving.insert(message_id.clone());
            (current_id, new_title)
        };

        self.persist_message(&session_id, &message, new_title).await;
        Ok(message_id)
    }

    /// One persistence cycle: create the message remotely (plus the
    /// session rename when a title was derived), retrying retryable
    /// failures with linear backoff. On exhaustion the message is queued
    /// and marked failed. Returns whether the write was confirmed.
    async fn persist_message(
        &self,
        session_id: &str,
        message: &Message,
        new_title: Option<String>,
    ) -> bool {
        let payload = NewMessage::from_message(session_id, message);

        for attempt in 1..=self.policy.max_attempts {
            match self.store.create_message(payload.clone()).await {
                Ok(_) => {
                    if let Some(title) = &new_title {
                        let changes = SessionChanges::title(title.clone());
                        if let Err(err) = self.store.update_session(session_id, changes).await {
                            warn!("Failed to rename session {}: {}", session_id, err);
                        }
                    }
                    self.confirm_saved(&message.id).await;
                    return true;
                }
                Err(err) => {
                    warn!(
                        "Save attempt {}/{} failed for message {}: {}",
                        attempt, self.policy.max_attempts, message.id, err
                    );
                    if !err.retryable() || attempt == self.policy.max_attempts {
                        error!("Giving up on message {}: {}", message.id, err);
                        break;
                    }
                    tokio::time::sleep(self.policy.base_delay * attempt).await;
                }
            }
        }

        self.mark_failed(session_id, message).await;
        false
    }

    async fn confirm_saved(&self, message_id: &str) {
        {
            let mut state = self.state.write().await;
            state.saving.remove(message_id);
            state.failed.remove(message_id);
        }
        if let Err(err) = self.vault.remove_pending(message_id) {
            warn!("Failed to update pending queue: {}", err);
        }
        debug!("Message {} persisted", message_id);
    }

    async fn mark_failed(&self, session_id: &str, message: &Message) {
        {
            let mut state = self.state.write().await;
            state.saving.remove(&message.id);
            state.failed.insert(message.id.clone());
        }
        let already_queued = self
            .vault
            .load_pending()
            .iter()
            .any(|entry| entry.message.id == message.id);
        if !already_queued {
            let entry = PendingMessage::new(message.clone(), session_id);
            if let Err(err) = self.vault.push_pending(entry) {
                warn!("Failed to queue message {} for retry: {}", message.id, err);
            }
        }
    }

    /// Re-persist queued messages after a successful remote load
    async fn replay_pending(&self) -> usize {
        let pending = self.vault.load_pending();
        if pending.is_empty() {
            return 0;
        }
        info!("Replaying {} pending message(s)", pending.len());

        let mut replayed = 0;
        for entry in pending {
            let present = {
                let state = self.state.read().await;
                state
                    .sessions
                    .iter()
                    .find(|s| s.id == entry.session_id)
                    .map(|s| s.contains_message(&entry.message.id))
            };

            match present {
                None => {
                    warn!(
                        "Dropping pending message {} for vanished session {}",
                        entry.message.id, entry.session_id
                    );
                    if let Err(err) = self.vault.remove_pending(&entry.message.id) {
                        warn!("Failed to update pending queue: {}", err);
                    }
                }
                Some(true) => {
                    // The remote copy already has it; the queue entry is stale.
                    if let Err(err) = self.vault.remove_pending(&entry.message.id) {
                        warn!("Failed to update pending queue: {}", err);
                    }
                }
                Some(false) => {
                    {
                        let mut state = self.state.write().await;
                        if let Some(session) = state
                            .sessions
                            .iter_mut()
                            .find(|s| s.id == entry.session_id)
                        {
                            // Restore the optimistic copy with its original
                            // id and timestamp, in timestamp order.
                            session.push(entry.message.clone());
                            session.messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
                        }
                        state.saving.insert(entry.message.id.clone());
                        state.failed.remove(&entry.message.id);
                    }
                    if self.persist_message(&entry.session_id, &entry.message, None).await {
                        replayed += 1;
                    }
                }
            }
        }
        replayed
    }

    /// Re-persist every message currently marked failed
    pub async fn retry_failed(&self) -> RetryReport {
        let failed_ids: HashSet<String> = self.state.read().await.failed.clone();
        if failed_ids.is_empty() {
            return RetryReport::default();
        }

        let mut entries: Vec<PendingMessage> = self
            .vault
            .load_pending()
            .into_iter()
            .filter(|entry| failed_ids.contains(&entry.message.id))
            .collect();

        // Failed messages that never made it into the queue can still be
        // recovered from local state.
        let covered: HashSet<String> = entries.iter().map(|e| e.message.id.clone()).collect();
        {
            let state = self.state.read().await;
            for id in &failed_ids {
                if covered.contains(id) {
                    continue;
                }
                for session in &state.sessions {
                    if let Some(message) = session.messages.iter().find(|m| m.id == *id) {
                        entries.push(PendingMessage::new(message.clone(), session.id.clone()));
                        break;
                    }
                }
            }
        }

        let mut report = RetryReport {
            attempted: entries.len(),
            ..Default::default()
        };
        info!("Retrying {} failed message(s)", report.attempted);

        for entry in entries {
            {
                let mut state = self.state.write().await;
                state.failed.remove(&entry.message.id);
                state.saving.insert(entry.message.id.clone());
            }
            if self.persist_message(&entry.session_id, &entry.message, None).await {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    /// Start the periodic retry task
    pub async fn run_retry_loop(&self) {
        {
            let running = self.running.read().await;
            if *running {
                debug!("Retry loop already running");
                return;
            }
        }
        *self.running.write().await = true;

        // Worker clone with its own task slot so the spawned task does
        // not hold a handle to itself.
        let worker = self.detached();
        let interval = self.policy.interval;

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if !*worker.running.read().await {
                    break;
                }
                if worker.has_failures().await {
                    let report = worker.retry_failed().await;
                    if report.attempted > 0 {
                        info!(
                            "Background retry: {} succeeded, {} still failing",
                            report.succeeded, report.failed
                        );
                    }
                }
            }
        });

        *self.task.write().await = Some(task);
        info!("Retry loop started (every {}s)", interval.as_secs());
    }

    /// Stop the periodic retry task
    pub async fn stop(&self) {
        *self.running.write().await = false;

        let mut task_guard = self.task.write().await;
        if let Some(task) = task_guard.take() {
            task.abort();
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    fn detached(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            vault: self.vault.clone(),
            user_id: self.user_id.clone(),
            policy: self.policy.clone(),
            state: Arc::clone(&self.state),
            running: Arc::clone(&self.running),
            task: Arc::new(RwLock::new(None)),
        }
    }

    /// Switch the current session.
    ///
    /// Refused while saves are in flight; switching away would strand
    /// the optimistic write attached to the current session.
    pub async fn switch_to(&self, session_id: &str) -> HistoryResult<()> {
        {
            let mut state = self.state.write().await;
            if !state.saving.is_empty() {
                return Err(HistoryError::SavesInFlight(state.saving.len()));
            }
            if !state.sessions.iter().any(|s| s.id == session_id) {
                return Err(HistoryError::SessionNotFound(session_id.to_string()));
            }
            state.current = Some(session_id.to_string());
        }
        if let Err(err) = self.vault.set_current_session(session_id) {
            warn!("Failed to persist current-session marker: {}", err);
        }
        debug!("Switched to session {}", session_id);
        Ok(())
    }

    /// Rename the current session; the remote update is best-effort
    pub async fn rename_current(&self, title: impl Into<String>) -> HistoryResult<()> {
        let title = title.into();
        let session_id = {
            let mut state = self.state.write().await;
            let current_id = state.current.clone().ok_or(HistoryError::NoCurrentSession)?;
            let session = state
                .sessions
                .iter_mut()
                .find(|s| s.id == current_id)
                .ok_or_else(|| HistoryError::SessionNotFound(current_id.clone()))?;
            session.title = title.clone();
            session.updated_at = Utc::now();
            current_id
        };

        if let Err(err) = self
            .store
            .update_session(&session_id, SessionChanges::title(title))
            .await
        {
            warn!("Failed to rename session {} remotely: {}", session_id, err);
        }
        Ok(())
    }

    /// Delete a session locally and remotely.
    ///
    /// The remote delete is best-effort. When the current session is
    /// deleted, the first remaining session becomes current. Queued
    /// messages belonging to the session are dropped with it.
    pub async fn delete_session(&self, session_id: &str) -> HistoryResult<()> {
        let exists = self
            .state
            .read()
            .await
            .sessions
            .iter()
            .any(|s| s.id == session_id);
        if !exists {
            return Err(HistoryError::SessionNotFound(session_id.to_string()));
        }

        if let Err(err) = self.store.delete_session(session_id).await {
            warn!("Failed to delete session {} remotely: {}", session_id, err);
        }

        let dropped = match self.vault.drop_pending_for_session(session_id) {
            Ok(ids) => ids,
            Err(err) => {
                warn!("Failed to update pending queue: {}", err);
                Vec::new()
            }
        };

        let current = {
            let mut state = self.state.write().await;
            state.sessions.retain(|s| s.id != session_id);
            for id in &dropped {
                state.saving.remove(id);
                state.failed.remove(id);
            }
            if state.current.as_deref() == Some(session_id) {
                state.current = state.sessions.first().map(|s| s.id.clone());
            }
            state.current.clone()
        };

        match &current {
            Some(id) => {
                if let Err(err) = self.vault.set_current_session(id) {
                    warn!("Failed to persist current-session marker: {}", err);
                }
            }
            None => {
                if let Err(err) = self.vault.clear_current_session() {
                    warn!("Failed to clear current-session marker: {}", err);
                }
            }
        }
        info!("Deleted session {}", session_id);
        Ok(())
    }

    /// Delete every session and reset local state. The migration marker
    /// stays set; cleared history must not migrate again.
    pub async fn clear_all(&self) -> HistoryResult<()> {
        let ids: Vec<String> = self
            .state
            .read()
            .await
            .sessions
            .iter()
            .map(|s| s.id.clone())
            .collect();

        for id in &ids {
            if let Err(err) = self.store.delete_session(id).await {
                warn!("Failed to delete session {} remotely: {}", id, err);
            }
        }

        {
            let mut state = self.state.write().await;
            state.sessions.clear();
            state.current = None;
            state.saving.clear();
            state.failed.clear();
        }

        if let Err(err) = self.vault.clear_archive() {
            warn!("Failed to clear archive: {}", err);
        }
        if let Err(err) = self.vault.clear_current_session() {
            warn!("Failed to clear current-session marker: {}", err);
        }
        if let Err(err) = self.vault.clear_pending() {
            warn!("Failed to clear pending queue: {}", err);
        }
        info!("Cleared {} session(s)", ids.len());
        Ok(())
    }

    /// Snapshot of the session list
    pub async fn sessions(&self) -> Vec<Session> {
        self.state.read().await.sessions.clone()
    }

    /// A session by id
    pub async fn session(&self, session_id: &str) -> Option<Session> {
        self.state
            .read()
            .await
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
    }

    /// The current session, if any
    pub async fn current_session(&self) -> Option<Session> {
        let state = self.state.read().await;
        let id = state.current.as_deref()?;
        state.sessions.iter().find(|s| s.id == id).cloned()
    }

    pub async fn current_session_id(&self) -> Option<String> {
        self.state.read().await.current.clone()
    }

    /// Ids with a persistence cycle in flight
    pub async fn saving_ids(&self) -> HashSet<String> {
        self.state.read().await.saving.clone()
    }

    /// Ids whose persistence exhausted its attempts
    pub async fn failed_ids(&self) -> HashSet<String> {
        self.state.read().await.failed.clone()
    }

    pub async fn has_failures(&self) -> bool {
        !self.state.read().await.failed.is_empty()
    }

    pub async fn is_saving(&self) -> bool {
        !self.state.read().await.saving.is_empty()
    }

    /// Entries currently in the pending queue
    pub fn pending_count(&self) -> usize {
        self.vault.load_pending().len()
    }
}
