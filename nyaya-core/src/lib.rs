//! Core types and utilities for nyaya
//!
//! This crate provides the domain types, configuration and logging
//! used by all other nyaya components.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
