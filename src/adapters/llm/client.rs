//! HTTP client for the chat-completions generation endpoint.
//!
//! Without an API key the client answers with a deterministic mock echo
//! of the request, so the rest of the pipeline can run end-to-end
//! against an unauthenticated environment.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::adapters::llm::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::GeneratorConfig;
use crate::domain::ports::{GenerationRequest, TextGenerator};

/// Only this provider's chat-completions shape is implemented.
const SUPPORTED_PROVIDER: &str = "together";

/// Total attempts before giving up on retryable statuses.
const MAX_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// System message used when the caller does not supply one.
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a cautious optimization assistant helping refine conversational agent prompts.";

const MOCK_MARKER: &str = "[MOCK]";
const MOCK_ECHO_CHARS: usize = 120;
const ERROR_BODY_LIMIT: usize = 500;

pub struct ChatCompletionsClient {
    config: GeneratorConfig,
    http_client: Client,
}

impl ChatCompletionsClient {
    pub fn new(config: GeneratorConfig) -> DomainResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, http_client })
    }

    fn build_messages(&self, request: &GenerationRequest) -> Vec<ChatMessage> {
        let system = request
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        vec![ChatMessage::system(system), ChatMessage::user(&request.prompt)]
    }

    fn mock_response(prompt: &str) -> String {
        let echo: String = prompt.chars().take(MOCK_ECHO_CHARS).collect();
        format!("{MOCK_MARKER} {echo} ...")
    }

    async fn execute_once(
        &self,
        api_key: &str,
        body: &ChatCompletionRequest,
    ) -> DomainResult<Attempt> {
        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            let text = response.text().await?;
            let parsed: ChatCompletionResponse = serde_json::from_str(&text)
                .map_err(|_| DomainError::MalformedResponse(truncate(&text, ERROR_BODY_LIMIT)))?;
            let content = parsed
                .first_content()
                .ok_or_else(|| DomainError::MalformedResponse(truncate(&text, ERROR_BODY_LIMIT)))?;
            return Ok(Attempt::Success(content));
        }

        if matches!(status.as_u16(), 429 | 500 | 502 | 503) {
            warn!(status = status.as_u16(), "retryable generation error");
            return Ok(Attempt::Retry);
        }

        let body_text = response.text().await.unwrap_or_default();
        Err(DomainError::UpstreamStatus {
            status: status.as_u16(),
            body: truncate(&body_text, ERROR_BODY_LIMIT),
        })
    }
}

enum Attempt {
    Success(String),
    Retry,
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    #[instrument(skip(self, request), fields(model = %self.config.model))]
    async fn generate(&self, request: GenerationRequest) -> DomainResult<String> {
        let Some(api_key) = self.config.api_key.clone() else {
            debug!("no API key configured, returning mock response");
            return Ok(Self::mock_response(&request.prompt));
        };

        if self.config.provider != SUPPORTED_PROVIDER {
            return Err(DomainError::UnsupportedProvider(self.config.provider.clone()));
        }

        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: self.build_messages(&request),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: request.temperature.unwrap_or(self.config.temperature),
        };

        let mut backoff = INITIAL_BACKOFF;
        for _attempt in 0..MAX_ATTEMPTS {
            match self.execute_once(&api_key, &body).await? {
                Attempt::Success(content) => return Ok(content),
                Attempt::Retry => {
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
        Err(DomainError::RetriesExhausted(MAX_ATTEMPTS))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_response_truncates_prompt() {
        let prompt = "p".repeat(500);
        let mock = ChatCompletionsClient::mock_response(&prompt);
        assert!(mock.starts_with("[MOCK] "));
        assert!(mock.contains(&"p".repeat(120)));
        assert!(!mock.contains(&"p".repeat(121)));
        assert!(mock.ends_with(" ..."));
    }

    #[test]
    fn test_mock_response_is_deterministic() {
        let a = ChatCompletionsClient::mock_response("same prompt");
        let b = ChatCompletionsClient::mock_response("same prompt");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_generate_without_key_uses_mock() {
        let client = ChatCompletionsClient::new(GeneratorConfig::default()).unwrap();
        let result = client
            .generate(GenerationRequest::new("improve this prompt"))
            .await
            .unwrap();
        assert!(result.starts_with("[MOCK] improve this prompt"));
    }

    #[tokio::test]
    async fn test_unsupported_provider_fails_before_network() {
        let config = GeneratorConfig {
            provider: "not-a-provider".to_string(),
            api_key: Some("key".to_string()),
            ..GeneratorConfig::default()
        };
        let client = ChatCompletionsClient::new(config).unwrap();
        let result = client.generate(GenerationRequest::new("prompt")).await;
        assert!(matches!(
            result,
            Err(DomainError::UnsupportedProvider(p)) if p == "not-a-provider"
        ));
    }

    #[test]
    fn test_default_system_prompt_applied() {
        let client = ChatCompletionsClient::new(GeneratorConfig::default()).unwrap();
        let messages = client.build_messages(&GenerationRequest::new("prompt"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(messages[1].content, "prompt");
    }

    #[test]
    fn test_explicit_system_prompt_wins() {
        let client = ChatCompletionsClient::new(GeneratorConfig::default()).unwrap();
        let request = GenerationRequest::new("prompt").with_system_prompt("custom role");
        let messages = client.build_messages(&request);
        assert_eq!(messages[0].content, "custom role");
    }
}
