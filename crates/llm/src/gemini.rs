//! Google Gemini `generateContent` adapter.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{
    Prompt, PromptStyle, ProviderError, ProviderOutput, ResponseSchema, Role, StructuredProvider,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::http::{build_client, decode_response, transport_error, LlmError, DEFAULT_TIMEOUT};

/// Production endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
/// Pre-call delay keeping the free tier under 15 requests per minute.
pub const GEMINI_FREE_TIER_PACING: Duration = Duration::from_secs(4);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn text_content(role: &str, text: &str) -> Content {
    Content {
        role: Some(role.to_string()),
        parts: vec![Part {
            text: Some(text.to_string()),
        }],
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Gemini provider. Built around single text prompts and paced by default.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    pacing: Option<Duration>,
}

impl GeminiProvider {
    /// Creates a provider for the default model with free-tier pacing.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    /// Like [`GeminiProvider::new`] with an explicit per-request timeout.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            pacing: Some(GEMINI_FREE_TIER_PACING),
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

    /// Overrides the pre-call pacing delay (`None` disables it).
    pub fn with_pacing(mut self, pacing: Option<Duration>) -> Self {
        self.pacing = pacing;
        self
    }

    fn build_request(&self, prompt: &Prompt, schema: &ResponseSchema) -> GenerateContentRequest {
        let (contents, system_instruction) = match prompt {
            Prompt::Text(text) => (vec![text_content("user", text)], None),
            Prompt::Chat(messages) => {
                let system = messages
                    .iter()
                    .filter(|m| m.role == Role::System)
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                let contents = messages
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .map(|m| {
                        let role = if m.role == Role::Assistant { "model" } else { "user" };
                        text_content(role, &m.content)
                    })
                    .collect();
                let system = (!system.is_empty()).then(|| Content {
                    role: None,
                    parts: vec![Part { text: Some(system) }],
                });
                (contents, system)
            }
        };

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema.to_openapi_schema(),
            },
        }
    }
}

#[async_trait]
impl StructuredProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn pacing(&self) -> Option<Duration> {
        self.pacing
    }

    fn prompt_style(&self) -> PromptStyle {
        PromptStyle::SingleText
    }

    #[instrument(skip(self, prompt, schema), fields(provider = "gemini", model = %self.model))]
    async fn generate(
        &self,
        prompt: &Prompt,
        schema: &ResponseSchema,
    ) -> Result<ProviderOutput, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = self.build_request(prompt, schema);
        debug!(contents = body.contents.len(), "Sending request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("gemini", e))?;
        let parsed: GenerateContentResponse = decode_response("gemini", response).await?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::Refusal {
                reason: format!("prompt blocked: {reason}"),
            });
        }

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::UnexpectedResponse {
                message: "response contained no candidates".into(),
            })?;
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
            return Err(ProviderError::UnexpectedResponse {
                message: format!("candidate contained no text (finish reason: {reason})"),
            });
        }

        debug!(chars = text.len(), "Received response");
        Ok(ProviderOutput::Text(text))
    }
}
