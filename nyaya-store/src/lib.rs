//! Remote session store client for nyaya
//!
//! This crate defines the CRUD surface the history synchronizer talks to
//! and a REST implementation for PostgREST-style backends.

pub mod base;
pub mod rest;

pub use base::{
    MessageChanges, MessageRecord, NewMessage, SessionChanges, SessionRecord, SessionStore,
    StoreError, StoreResult,
};
pub use rest::RestStore;
