//! Chat domain types
//!
//! Sessions are named conversation threads; messages are single turns
//! carrying optional structured legal metadata. Serialized field names
//! match the remote store's column format.

pub mod message;
pub mod session;

pub use message::{ActionStep, ContactInfo, ContactKind, LegalReference, Message, Sender};
pub use session::{derive_title, Session, DEFAULT_TITLE};
