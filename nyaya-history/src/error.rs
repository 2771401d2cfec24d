//! Error types for the history layer

use nyaya_store::StoreError;
use thiserror::Error;

/// Error type for history operations
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No current session")]
    NoCurrentSession,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("{0} message(s) still being saved")]
    SavesInFlight(usize),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

impl From<HistoryError> for nyaya_core::Error {
    fn from(err: HistoryError) -> Self {
        nyaya_core::Error::History(err.to_string())
    }
}
