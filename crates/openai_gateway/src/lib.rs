//! OpenAI-compatible chat-completions gateway in front of Google's Gemini
//! generateContent API.

pub mod adapter;
pub mod cache;
pub mod client;
pub mod config;
pub mod dump;
pub mod handlers;
pub mod server;
