//! The LLM provider port.
//!
//! Infrastructure crates implement [`StructuredProvider`] for concrete APIs;
//! the gateway in the `nodes` crate only ever sees this trait. A provider is
//! selected once at startup and passed around as `Arc<dyn StructuredProvider>`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{Prompt, PromptStyle, ProviderError, ResponseSchema};

/// Raw output of a structured generation call.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutput {
    /// Generated text that should contain a JSON document.
    Text(String),
    /// Output the provider has already parsed into JSON.
    Parsed(Value),
}

/// Capability to generate content constrained to a [`ResponseSchema`].
#[async_trait]
pub trait StructuredProvider: Send + Sync {
    /// Short provider name used in logs (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Fixed delay to wait before each top-level call, for providers with a
    /// known request quota.
    fn pacing(&self) -> Option<Duration> {
        None
    }

    /// The prompt form this provider is built around.
    fn prompt_style(&self) -> PromptStyle;

    /// Performs one generation call. Implementations must not retry.
    async fn generate(
        &self,
        prompt: &Prompt,
        schema: &ResponseSchema,
    ) -> Result<ProviderOutput, ProviderError>;
}
