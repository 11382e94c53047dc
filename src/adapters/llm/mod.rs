//! Generative rewrite endpoint adapter.

pub mod client;
pub mod types;

pub use client::ChatCompletionsClient;
pub use types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
