//! LLM provider integrations for nyaya
//!
//! This crate provides the counsel-provider abstraction, the Gemini
//! implementation and the structured-reply decoder.

pub mod base;
pub mod gemini;
pub mod reply;

pub use base::{
    Attachment, CounselEvent, CounselEventStream, CounselProvider, CounselReply, CounselRequest,
    HistoryTurn, ProviderError, ProviderResult, TurnRole,
};
pub use gemini::{GeminiClient, GenerationSettings, AVAILABLE_MODELS, DEFAULT_MODEL};
pub use reply::decode_reply;
