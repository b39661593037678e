//! Fix suggestions from an OpenAI-compatible model.
//!
//! - **Client**: chat completion client with bearer auth
//! - **Suggest**: turns a [`crate::FailureDigest`] into a fix prompt and asks the model

pub mod client;
pub mod suggest;

pub use client::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, LlmClient, LlmClientError, LlmConfig,
    MessageRole,
};
pub use suggest::{FixSuggester, Suggestion};
