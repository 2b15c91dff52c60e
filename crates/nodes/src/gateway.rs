//! The LLM gateway: every LLM call made by a job goes through [`LlmGateway`].
//!
//! One [`LlmGateway::invoke`] call:
//!
//! 1. waits the provider's pacing delay once, if it declares one;
//! 2. calls the provider and validates the output against the schema;
//! 3. on a provider failure or malformed output, waits `base * 2^attempt`
//!    and tries again, up to the schedule's attempt limit.
//!
//! The pacing delay is not repeated between retries. Exhausting the attempts
//! yields [`GatewayError::Exhausted`]; callers decide whether that skips the
//! item or ends the run.

use std::sync::Arc;

use pipeline::{
    Prompt, ProviderError, ProviderOutput, ResponseSchema, RetryPolicy, RetrySchedule,
    SchemaError, StructuredProvider, StructuredRecord,
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttemptFailure {
    /// The provider call itself failed.
    #[error(transparent)]
    Provider(ProviderError),
    /// The provider answered, but not with data matching the schema.
    #[error(transparent)]
    Malformed(SchemaError),
}

impl AttemptFailure {
    fn retry_policy(&self) -> RetryPolicy {
        match self {
            AttemptFailure::Provider(err) => err.retry_policy(),
            AttemptFailure::Malformed(_) => RetryPolicy::Retryable { after: None },
        }
    }
}

/// Failure of a whole gateway invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// The prompt had no content; the provider was not called.
    #[error("prompt is empty")]
    EmptyPrompt,

    /// Every permitted attempt failed.
    #[error("{provider} call failed after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Provider name.
        provider: String,
        /// Number of attempts made.
        attempts: u32,
        /// Failure of the final attempt.
        last: AttemptFailure,
    },

    /// The provider rejected the request in a way retrying cannot fix.
    #[error("{provider} rejected the request: {source}")]
    Rejected {
        /// Provider name.
        provider: String,
        /// The rejection.
        source: ProviderError,
    },
}

/// Resilient wrapper around a [`StructuredProvider`].
#[derive(Clone)]
pub struct LlmGateway {
    provider: Arc<dyn StructuredProvider>,
    schedule: RetrySchedule,
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .field("schedule", &self.schedule)
            .finish()
    }
}

impl LlmGateway {
    /// Creates a gateway over `provider` retrying according to `schedule`.
    pub fn new(provider: Arc<dyn StructuredProvider>, schedule: RetrySchedule) -> Self {
        Self { provider, schedule }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &dyn StructuredProvider {
        self.provider.as_ref()
    }

    /// Calls the provider and returns a record matching `schema`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::EmptyPrompt`] if `prompt` has no content.
    /// - [`GatewayError::Rejected`] on a non-retryable provider error.
    /// - [`GatewayError::Exhausted`] once every attempt has failed.
    #[instrument(skip_all, fields(provider = self.provider.name(), schema = schema.name()))]
    pub async fn invoke(
        &self,
        prompt: &Prompt,
        schema: &ResponseSchema,
    ) -> Result<StructuredRecord, GatewayError> {
        if prompt.is_empty() {
            return Err(GatewayError::EmptyPrompt);
        }

        if let Some(pacing) = self.provider.pacing() {
            debug!(pacing_ms = pacing.as_millis() as u64, "Pacing before call");
            tokio::time::sleep(pacing).await;
        }

        let mut attempt = 0u32;
        loop {
            let failure = match self.provider.generate(prompt, schema).await {
                Ok(output) => match parse_output(schema, output) {
                    Ok(record) => return Ok(record),
                    Err(err) => {
                        warn!(attempt, error = %err, "Malformed output");
                        AttemptFailure::Malformed(err)
                    }
                },
                Err(err) => {
                    warn!(attempt, error = %err, "Provider call failed");
                    if err.retry_policy() == RetryPolicy::NonRetryable {
                        return Err(GatewayError::Rejected {
                            provider: self.provider.name().to_string(),
                            source: err,
                        });
                    }
                    AttemptFailure::Provider(err)
                }
            };

            if !self.schedule.has_attempt_after(attempt) {
                warn!(attempts = attempt + 1, "Max retries reached");
                return Err(GatewayError::Exhausted {
                    provider: self.provider.name().to_string(),
                    attempts: attempt + 1,
                    last: failure,
                });
            }

            let delay = self.schedule.delay_after(attempt, &failure.retry_policy());
            info!(attempt, delay_secs = delay.as_secs_f64(), "Retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn parse_output(
    schema: &ResponseSchema,
    output: ProviderOutput,
) -> Result<StructuredRecord, SchemaError> {
    match output {
        ProviderOutput::Text(text) => schema.parse_text(&text).inspect_err(|_| {
            debug!(response_text = %text, "Response text did not match schema");
        }),
        ProviderOutput::Parsed(value) => schema.validate(value),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use pipeline::PromptStyle;
    use serde_json::json;
    use tokio::time::Instant;

    use super::*;

    /// Provider stub replaying a scripted sequence of outcomes and counting calls.
    struct ScriptedProvider {
        pacing: Option<Duration>,
        script: Mutex<VecDeque<Result<ProviderOutput, ProviderError>>>,
        fallback: Result<ProviderOutput, ProviderError>,
        calls: Mutex<u32>,
    }

    impl ScriptedProvider {
        fn new(
            script: Vec<Result<ProviderOutput, ProviderError>>,
            fallback: Result<ProviderOutput, ProviderError>,
        ) -> Self {
            Self {
                pacing: None,
                script: Mutex::new(script.into()),
                fallback,
                calls: Mutex::new(0),
            }
        }

        fn paced(mut self, pacing: Duration) -> Self {
            self.pacing = Some(pacing);
            self
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl StructuredProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "stub-1"
        }

        fn pacing(&self) -> Option<Duration> {
            self.pacing
        }

        fn prompt_style(&self) -> PromptStyle {
            PromptStyle::SingleText
        }

        async fn generate(
            &self,
            _prompt: &Prompt,
            _schema: &ResponseSchema,
        ) -> Result<ProviderOutput, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        }
    }

    fn server_error() -> Result<ProviderOutput, ProviderError> {
        Err(ProviderError::Server {
            status: 503,
            message: "overloaded".into(),
        })
    }

    fn rating(value: i64) -> Result<ProviderOutput, ProviderError> {
        Ok(ProviderOutput::Text(format!(r#"{{"rating": {value}}}"#)))
    }

    fn schema() -> ResponseSchema {
        ResponseSchema::new("TaskRating").integer_field("rating", Some(1), Some(5))
    }

    fn prompt() -> Prompt {
        Prompt::Text("Pilot - Radio communication".into())
    }

    fn gateway(provider: &Arc<ScriptedProvider>) -> LlmGateway {
        LlmGateway::new(provider.clone(), RetrySchedule::default())
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt_incurs_no_delay() {
        let provider = Arc::new(ScriptedProvider::new(vec![], rating(3)));
        let started = Instant::now();

        let record = gateway(&provider).invoke(&prompt(), &schema()).await.unwrap();

        assert_eq!(record.integer("rating"), Some(3));
        assert_eq!(provider.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn two_transient_failures_back_off_one_then_two_seconds() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![server_error(), server_error()],
            rating(2),
        ));
        let started = Instant::now();

        let record = gateway(&provider).invoke(&prompt(), &schema()).await.unwrap();

        assert_eq!(record.integer("rating"), Some(2));
        assert_eq!(provider.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failure_exhausts_after_max_attempts() {
        let provider = Arc::new(ScriptedProvider::new(vec![], server_error()));

        let err = gateway(&provider).invoke(&prompt(), &schema()).await.unwrap_err();

        assert_eq!(provider.calls(), 3);
        match err {
            GatewayError::Exhausted { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert!(matches!(last, AttemptFailure::Provider(ProviderError::Server { .. })));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_json_follows_the_transport_failure_path() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![],
            Ok(ProviderOutput::Text("{\"rating\": ".into())),
        ));
        let started = Instant::now();

        let err = gateway(&provider).invoke(&prompt(), &schema()).await.unwrap_err();

        assert_eq!(provider.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert!(matches!(
            err,
            GatewayError::Exhausted {
                last: AttemptFailure::Malformed(SchemaError::InvalidJson { .. }),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_value_is_retried_as_malformed() {
        let provider = Arc::new(ScriptedProvider::new(vec![rating(9)], rating(4)));

        let record = gateway(&provider).invoke(&prompt(), &schema()).await.unwrap();

        assert_eq!(record.integer("rating"), Some(4));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_applies_once_per_invocation() {
        let provider = Arc::new(
            ScriptedProvider::new(vec![server_error(), server_error()], rating(1))
                .paced(Duration::from_secs(4)),
        );
        let started = Instant::now();

        gateway(&provider).invoke(&prompt(), &schema()).await.unwrap();

        // 4 s pacing + 1 s + 2 s back-off; pacing is not repeated between retries.
        assert_eq!(started.elapsed(), Duration::from_secs(7));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn parsed_output_is_validated_without_text_parsing() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![],
            Ok(ProviderOutput::Parsed(json!({ "rating": 5 }))),
        ));

        let record = gateway(&provider).invoke(&prompt(), &schema()).await.unwrap();

        assert_eq!(record.integer("rating"), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_prompt_never_reaches_the_provider() {
        let provider = Arc::new(ScriptedProvider::new(vec![], rating(3)));

        let err = gateway(&provider)
            .invoke(&Prompt::Text("   ".into()), &schema())
            .await
            .unwrap_err();

        assert_eq!(err, GatewayError::EmptyPrompt);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_credentials_stop_immediately() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![],
            Err(ProviderError::Api {
                status: 401,
                message: "invalid api key".into(),
            }),
        ));

        let err = gateway(&provider).invoke(&prompt(), &schema()).await.unwrap_err();

        assert!(matches!(err, GatewayError::Rejected { .. }));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_hint_extends_the_back_off() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![Err(ProviderError::RateLimited {
                retry_after: Some(Duration::from_secs(30)),
                message: "quota".into(),
            })],
            rating(3),
        ));
        let started = Instant::now();

        gateway(&provider).invoke(&prompt(), &schema()).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_retry_after_hint_is_capped() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![],
            Err(ProviderError::RateLimited {
                retry_after: Some(Duration::from_secs(86_400)),
                message: "daily quota".into(),
            }),
        ));
        let started = Instant::now();

        let err = gateway(&provider).invoke(&prompt(), &schema()).await.unwrap_err();

        assert!(matches!(err, GatewayError::Exhausted { attempts: 3, .. }));
        assert_eq!(started.elapsed(), pipeline::DEFAULT_MAX_HINT * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_attempt_limit_is_honoured() {
        let provider = Arc::new(ScriptedProvider::new(vec![], server_error()));
        let schedule = RetrySchedule::new(5, Duration::from_millis(10)).unwrap();
        let gateway = LlmGateway::new(provider.clone(), schedule);

        let err = gateway.invoke(&prompt(), &schema()).await.unwrap_err();

        assert!(matches!(err, GatewayError::Exhausted { attempts: 5, .. }));
        assert_eq!(provider.calls(), 5);
    }
}
