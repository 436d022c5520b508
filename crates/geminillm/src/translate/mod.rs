//! Request/response translation between the OpenAI wire format and the
//! Gemini conversation format.
//!
//! The request side folds the flat role-tagged message list into a strictly
//! alternating two-party turn list (`request`); the response side maps the
//! provider's candidates back into wire-format choices (`response`).

pub mod request;
pub mod response;

pub use request::{
    enforce_turn_order, merge_messages, party_for_role, split_tail, to_contents,
    to_generation_config,
};
pub use response::{role_for_party, to_chat_response, to_stream_chunk};

use crate::apis::openai::Role;
use thiserror::Error;

/// Injected as a synthetic opening turn when the conversation does not start
/// with the user party; the provider requires it to.
pub const PRIMING_PROMPT: &str = "I will ask you a question. Please answer it.";

#[derive(Debug, Error)]
pub enum TranslationError {
    /// The request used a role this gateway cannot express as a Gemini party.
    #[error("role {0:?} has no Gemini party equivalent")]
    UnmappableRole(Role),
    /// The conversation must end with a user-authored message; this is
    /// checked where the request enters the system.
    #[error("conversation must end with a user message")]
    LastMessageNotUser,
    #[error("conversation has no messages")]
    EmptyConversation,
    /// A `data:<mime>;base64,<payload>` image literal that does not decode.
    #[error("invalid image url: {0}")]
    InvalidImageUrl(String),
    /// The provider reported a finish reason outside the known vocabulary.
    #[error("unmapped Gemini finish reason")]
    UnmappedFinishReason,
    /// A shape upstream validation should have made impossible.
    #[error("internal: {0}")]
    Internal(&'static str),
}
