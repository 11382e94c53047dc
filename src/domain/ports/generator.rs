//! Text generation port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// A single rewrite request to the generative endpoint.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Override for the client's configured max tokens.
    pub max_tokens: Option<u32>,
    /// Override for the client's configured temperature.
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Client interface for the external text-generation endpoint.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for the request, applying the client's retry policy.
    async fn generate(&self, request: GenerationRequest) -> DomainResult<String>;

    /// Model identifier recorded on optimization runs.
    fn model(&self) -> &str;
}
