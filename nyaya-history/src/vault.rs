//! File-backed local storage for history state
//!
//! The vault mirrors what the product keeps on the client between runs:
//! the legacy session archive, the current-session marker, the one-time
//! migration marker and the pending message queue. It is a cache, not a
//! source of truth: reads tolerate missing or corrupt files, writes
//! create the directory on demand.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use nyaya_core::chat::{Message, Session};

use crate::error::HistoryResult;

const ARCHIVE_FILE: &str = "sessions.json";
const CURRENT_FILE: &str = "current-session";
const MIGRATION_FILE: &str = "migration-completed";
const PENDING_FILE: &str = "pending-messages.json";

/// A message waiting for remote persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub message: Message,
    pub session_id: String,
    pub queued_at: DateTime<Utc>,
}

impl PendingMessage {
    pub fn new(message: Message, session_id: impl Into<String>) -> Self {
        Self {
            message,
            session_id: session_id.into(),
            queued_at: Utc::now(),
        }
    }
}

/// File-backed storage under the history data directory
#[derive(Debug, Clone)]
pub struct LocalVault {
    dir: PathBuf,
}

impl LocalVault {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Create the data directory if it is missing
    pub fn ensure_dir(&self) -> HistoryResult<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.dir.join(name);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!("Ignoring corrupt {}: {}", name, err);
                    None
                }
            },
            Err(err) => {
                warn!("Failed to read {}: {}", name, err);
                None
            }
        }
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> HistoryResult<()> {
        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(value)?;
        fs::write(self.dir.join(name), content)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> HistoryResult<()> {
        let path = self.dir.join(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Legacy local session archive, the migration source
    pub fn load_archive(&self) -> Vec<Session> {
        self.read_json(ARCHIVE_FILE).unwrap_or_default()
    }

    pub fn save_archive(&self, sessions: &[Session]) -> HistoryResult<()> {
        self.write_json(ARCHIVE_FILE, &sessions)
    }

    pub fn clear_archive(&self) -> HistoryResult<()> {
        self.remove(ARCHIVE_FILE)
    }

    /// Id of the session to restore on the next load
    pub fn current_session(&self) -> Option<String> {
        let path = self.dir.join(CURRENT_FILE);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(content) => {
                let id = content.trim().to_string();
                if id.is_empty() {
                    None
                } else {
                    Some(id)
                }
            }
            Err(err) => {
                warn!("Failed to read current-session marker: {}", err);
                None
            }
        }
    }

    pub fn set_current_session(&self, id: &str) -> HistoryResult<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(CURRENT_FILE), id)?;
        Ok(())
    }

    pub fn clear_current_session(&self) -> HistoryResult<()> {
        self.remove(CURRENT_FILE)
    }

    /// Whether the one-time migration already ran
    pub fn migration_completed(&self) -> bool {
        self.dir.join(MIGRATION_FILE).exists()
    }

    pub fn mark_migration_completed(&self) -> HistoryResult<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(MIGRATION_FILE), Utc::now().to_rfc3339())?;
        Ok(())
    }

    /// Messages still waiting for remote persistence
    pub fn load_pending(&self) -> Vec<PendingMessage> {
        self.read_json(PENDING_FILE).unwrap_or_default()
    }

    pub fn save_pending(&self, pending: &[PendingMessage]) -> HistoryResult<()> {
        if pending.is_empty() {
            return self.remove(PENDING_FILE);
        }
        self.write_json(PENDING_FILE, &pending)
    }

    pub fn push_pending(&self, entry: PendingMessage) -> HistoryResult<()> {
        let mut pending = self.load_pending();
        pending.push(entry);
        self.save_pending(&pending)
    }

    pub fn remove_pending(&self, message_id: &str) -> HistoryResult<()> {
        let mut pending = self.load_pending();
        pending.retain(|entry| entry.message.id != message_id);
        self.save_pending(&pending)
    }

    /// Drop queued entries for a session, returning the removed message ids
    pub fn drop_pending_for_session(&self, session_id: &str) -> HistoryResult<Vec<String>> {
        let pending = self.load_pending();
        let (dropped, kept): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|entry| entry.session_id == session_id);
        self.save_pending(&kept)?;
        Ok(dropped.into_iter().map(|entry| entry.message.id).collect())
    }

    pub fn clear_pending(&self) -> HistoryResult<()> {
        self.remove(PENDING_FILE)
    }
}
