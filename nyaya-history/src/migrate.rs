//! One-time migration of locally archived sessions into the remote store

use nyaya_store::{NewMessage, SessionStore};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::HistoryResult;
use crate::vault::LocalVault;

/// Outcome of the one-time local-to-remote migration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Sessions created remotely
    pub sessions: usize,
    /// Messages created remotely
    pub messages: usize,
    /// True when remote data already existed and the archive was discarded
    pub skipped_existing: bool,
}

/// Migrate the legacy local archive into the remote store.
///
/// Returns `None` when there is nothing to migrate or the migration
/// already ran. The completion marker is only set once the remote copy
/// is authoritative: either the archive was fully transferred, or the
/// remote already had sessions for this user. A store error aborts with
/// the marker unset and the archive intact, so the next load retries.
pub async fn run_migration(
    store: &dyn SessionStore,
    vault: &LocalVault,
    user_id: &str,
) -> HistoryResult<Option<MigrationReport>> {
    if vault.migration_completed() {
        return Ok(None);
    }

    let archive = vault.load_archive();
    if archive.is_empty() {
        // Nothing local yet. Leave the marker unset so sessions archived
        // before a later first login still migrate.
        return Ok(None);
    }

    let existing = store.sessions_for_user(user_id).await?;
    if !existing.is_empty() {
        info!(
            "Remote store already has {} session(s), discarding local archive",
            existing.len()
        );
        vault.mark_migration_completed()?;
        vault.clear_archive()?;
        return Ok(Some(MigrationReport {
            sessions: 0,
            messages: 0,
            skipped_existing: true,
        }));
    }

    let mut report = MigrationReport::default();
    for session in &archive {
        let record = store.create_session(user_id, &session.title).await?;
        report.sessions += 1;
        for message in &session.messages {
            store
                .create_message(NewMessage::from_message(&record.id, message))
                .await?;
            report.messages += 1;
        }
    }

    vault.mark_migration_completed()?;
    vault.clear_archive()?;
    info!(
        "Migrated {} session(s) with {} message(s) to the remote store",
        report.sessions, report.messages
    );
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use nyaya_core::chat::{Message, Session};
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn archived_session(title: &str, contents: &[&str]) -> Session {
        let mut session = Session::new(uuid::Uuid::new_v4().to_string(), title);
        for content in contents {
            session.push(Message::user(*content));
        }
        session
    }

    #[tokio::test]
    async fn test_migration_noop_without_archive() {
        let temp_dir = TempDir::new().unwrap();
        let vault = LocalVault::new(temp_dir.path());
        let store = MemoryStore::default();

        let report = run_migration(&store, &vault, "user-1").await.unwrap();
        assert!(report.is_none());
        // Marker stays unset so local data archived later still migrates
        assert!(!vault.migration_completed());
    }

    #[tokio::test]
    async fn test_migration_transfers_archive() {
        let temp_dir = TempDir::new().unwrap();
        let vault = LocalVault::new(temp_dir.path());
        let store = MemoryStore::default();

        let session = archived_session("Property dispute", &["who owns the land?", "and now?"]);
        let message_id = session.messages[0].id.clone();
        vault.save_archive(&[session]).unwrap();

        let report = run_migration(&store, &vault, "user-1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.sessions, 1);
        assert_eq!(report.messages, 2);
        assert!(!report.skipped_existing);
        assert_eq!(store.session_count(), 1);
        assert_eq!(store.message_count(), 2);
        assert!(vault.migration_completed());
        assert!(vault.load_archive().is_empty());

        // Message identity survives the transfer
        let sessions = store.sessions_for_user("user-1").await.unwrap();
        let messages = store.messages_for_session(&sessions[0].id).await.unwrap();
        assert!(messages.iter().any(|m| m.id == message_id));
    }

    #[tokio::test]
    async fn test_migration_defers_to_existing_remote_data() {
        let temp_dir = TempDir::new().unwrap();
        let vault = LocalVault::new(temp_dir.path());
        let store = MemoryStore::default();
        store.seed_session("user-1", "Already remote");

        vault
            .save_archive(&[archived_session("Local only", &["hello"])])
            .unwrap();

        let report = run_migration(&store, &vault, "user-1")
            .await
            .unwrap()
            .unwrap();

        assert!(report.skipped_existing);
        assert_eq!(report.sessions, 0);
        assert!(vault.migration_completed());
        assert!(vault.load_archive().is_empty());
        // The remote copy wins; nothing was uploaded
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_migration_failure_leaves_marker_unset() {
        let temp_dir = TempDir::new().unwrap();
        let vault = LocalVault::new(temp_dir.path());
        let store = MemoryStore::default();
        store.fail_create_session.store(true, Ordering::SeqCst);

        vault
            .save_archive(&[archived_session("Local only", &["hello"])])
            .unwrap();

        let result = run_migration(&store, &vault, "user-1").await;
        assert!(result.is_err());
        assert!(!vault.migration_completed());
        assert_eq!(vault.load_archive().len(), 1);
    }

    #[tokio::test]
    async fn test_migration_noop_after_completion() {
        let temp_dir = TempDir::new().unwrap();
        let vault = LocalVault::new(temp_dir.path());
        let store = MemoryStore::default();

        vault.mark_migration_completed().unwrap();
        vault
            .save_archive(&[archived_session("Stale", &["old"])])
            .unwrap();

        let report = run_migration(&store, &vault, "user-1").await.unwrap();
        assert!(report.is_none());
        assert_eq!(store.session_count(), 0);
    }
}
