//! OpenAI chat completions adapter using structured outputs.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{
    ChatMessage, Prompt, PromptStyle, ProviderError, ProviderOutput, ResponseSchema,
    StructuredProvider,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::http::{build_client, decode_response, transport_error, LlmError, DEFAULT_TIMEOUT};

/// Production endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
/// Model used when none is configured.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// OpenAI provider. Built around chat prompts; no pacing.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Creates a provider for the default model.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    /// Like [`OpenAiProvider::new`] with an explicit per-request timeout.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    /// Uses `model` instead of the default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sends requests to `base_url` instead of the production endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request<'a>(&'a self, prompt: &Prompt, schema: &ResponseSchema) -> ChatRequest<'a> {
        let messages = match prompt {
            Prompt::Text(text) => vec![ChatMessage::user(text.clone())],
            Prompt::Chat(messages) => messages.clone(),
        };
        ChatRequest {
            model: &self.model,
            messages,
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name(),
                    "strict": true,
                    "schema": schema.to_json_schema(),
                },
            }),
        }
    }
}

#[async_trait]
impl StructuredProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn prompt_style(&self) -> PromptStyle {
        PromptStyle::Chat
    }

    #[instrument(skip(self, prompt, schema), fields(provider = "openai", model = %self.model))]
    async fn generate(
        &self,
        prompt: &Prompt,
        schema: &ResponseSchema,
    ) -> Result<ProviderOutput, ProviderError> {
        let body = self.build_request(prompt, schema);
        debug!(message_count = body.messages.len(), "Sending request");

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("openai", e))?;
        let parsed: ChatResponse = decode_response("openai", response).await?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::UnexpectedResponse {
                message: "response contained no choices".into(),
            })?;

        if let Some(reason) = choice.message.refusal {
            return Err(ProviderError::Refusal { reason });
        }

        match choice.message.content {
            Some(content) if !content.is_empty() => {
                debug!(chars = content.len(), "Received response");
                Ok(ProviderOutput::Text(content))
            }
            _ => Err(ProviderError::UnexpectedResponse {
                message: format!(
                    "choice contained no content (finish reason: {})",
                    choice.finish_reason.as_deref().unwrap_or("unknown")
                ),
            }),
        }
    }
}
