//! Chat history synchronization for nyaya
//!
//! Keeps an optimistic in-memory session list in step with the remote
//! store: local updates apply immediately, remote writes retry with
//! linear backoff, and anything that cannot be persisted lands in a
//! file-backed pending queue that is replayed on the next load or by
//! the periodic retry task. Legacy local data is migrated to the remote
//! store exactly once.

pub mod error;
pub mod migrate;
pub mod service;
pub mod vault;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{HistoryError, HistoryResult};
pub use migrate::MigrationReport;
pub use service::{
    ChatHistory, LoadReport, LoadSource, MessageDraft, RetryPolicy, RetryReport, GREETING,
};
pub use vault::{LocalVault, PendingMessage};
