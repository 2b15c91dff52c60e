//! Run configuration assembled from arguments and the environment.

use std::sync::Arc;
use std::time::Duration;

use llm::{GeminiProvider, LlmError, OpenAiProvider};
use nodes::FailurePolicy;
use pipeline::{AnnotatorError, RetrySchedule, StructuredProvider};

use crate::args::{Cli, Command, LogFormat, ProviderKind};

/// Credentials and model for the selected provider.
#[derive(Clone, PartialEq, Eq)]
pub enum ProviderSettings {
    /// Google Gemini with an optional pre-call pacing delay.
    Gemini {
        api_key: String,
        model: String,
        pacing: Option<Duration>,
    },
    /// OpenAI chat completions.
    OpenAi { api_key: String, model: String },
}

// Keys stay out of logs and panics.
impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderSettings::Gemini { model, pacing, .. } => f
                .debug_struct("Gemini")
                .field("model", model)
                .field("pacing", pacing)
                .finish_non_exhaustive(),
            ProviderSettings::OpenAi { model, .. } => f
                .debug_struct("OpenAi")
                .field("model", model)
                .finish_non_exhaustive(),
        }
    }
}

impl ProviderSettings {
    /// Provider name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderSettings::Gemini { .. } => "gemini",
            ProviderSettings::OpenAi { .. } => "openai",
        }
    }

    /// Builds the provider adapter.
    pub fn build(&self) -> Result<Arc<dyn StructuredProvider>, LlmError> {
        Ok(match self {
            ProviderSettings::Gemini {
                api_key,
                model,
                pacing,
            } => Arc::new(
                GeminiProvider::new(api_key.as_str())?
                    .with_model(model.as_str())
                    .with_pacing(*pacing),
            ),
            ProviderSettings::OpenAi { api_key, model } => {
                Arc::new(OpenAiProvider::new(api_key.as_str())?.with_model(model.as_str()))
            }
        })
    }
}

/// Logging settings, applied before anything else runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Pretty or JSON log lines.
    pub format: LogFormat,
    /// Default to `debug` instead of `info` when `RUST_LOG` is unset.
    pub verbose: bool,
    /// Collector for span export, if any.
    pub otlp_endpoint: Option<String>,
}

impl LogSettings {
    /// Extracts the logging options; blank endpoints are treated as unset.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.log_format,
            verbose: cli.verbose,
            otlp_endpoint: cli.otlp_endpoint.clone().filter(|e| !e.trim().is_empty()),
        }
    }
}

/// Everything a run needs, validated up front.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Provider used for every call.
    pub provider: ProviderSettings,
    /// Attempts, back-off and retry-hint cap.
    pub schedule: RetrySchedule,
    /// Skip failed items, or abort with `--strict`.
    pub failure_policy: FailurePolicy,
    /// Job and table paths.
    pub command: Command,
}

impl AppConfig {
    /// Validates the parsed arguments.
    ///
    /// # Errors
    ///
    /// [`AnnotatorError::MissingCredential`] if the key for the selected
    /// provider is unset or blank.
    pub fn from_cli(cli: Cli) -> Result<Self, AnnotatorError> {
        let provider = match cli.model {
            ProviderKind::Gemini => ProviderSettings::Gemini {
                api_key: credential(cli.gemini_api_key, "GEMINI_API_KEY")?,
                model: cli.gemini_model,
                pacing: Some(Duration::from_secs(cli.gemini_pacing_secs))
                    .filter(|p| !p.is_zero()),
            },
            ProviderKind::Openai => ProviderSettings::OpenAi {
                api_key: credential(cli.openai_api_key, "OPENAI_API_KEY")?,
                model: cli.openai_model,
            },
        };

        let schedule = RetrySchedule::new(cli.max_attempts, Duration::from_secs(1))
            .ok_or_else(|| AnnotatorError::ConfigurationError {
                message: "--max-attempts must be at least 1".to_string(),
            })?
            .with_max_hint(Duration::from_secs(cli.max_retry_wait_secs));

        let failure_policy = if cli.strict {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Skip
        };

        Ok(Self {
            provider,
            schedule,
            failure_policy,
            command: cli.command,
        })
    }
}

fn credential(value: Option<String>, variable: &'static str) -> Result<String, AnnotatorError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AnnotatorError::MissingCredential { variable })
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut cli = Cli::try_parse_from(args).unwrap();
        // Ignore whatever the test environment exports.
        cli.gemini_api_key = None;
        cli.openai_api_key = None;
        cli
    }

    #[test]
    fn missing_gemini_key_names_the_variable() {
        let cli = parse(&["exposure", "classify"]);

        let err = AppConfig::from_cli(cli).unwrap_err();

        assert!(matches!(
            err,
            AnnotatorError::MissingCredential {
                variable: "GEMINI_API_KEY"
            }
        ));
    }

    #[test]
    fn blank_openai_key_counts_as_missing() {
        let mut cli = parse(&["exposure", "-m", "openai", "classify"]);
        cli.openai_api_key = Some("   ".into());

        let err = AppConfig::from_cli(cli).unwrap_err();

        assert!(matches!(
            err,
            AnnotatorError::MissingCredential {
                variable: "OPENAI_API_KEY"
            }
        ));
    }

    #[test]
    fn only_the_selected_provider_needs_a_key() {
        let mut cli = parse(&["exposure", "-m", "openai", "--strict", "generate-tasks"]);
        cli.openai_api_key = Some("sk-test".into());

        let config = AppConfig::from_cli(cli).unwrap();

        assert_eq!(config.provider.name(), "openai");
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.schedule.max_attempts(), 3);
    }

    #[test]
    fn retry_wait_cap_reaches_the_schedule() {
        let mut cli = parse(&["exposure", "--max-retry-wait-secs", "5", "classify"]);
        cli.gemini_api_key = Some("key".into());

        let config = AppConfig::from_cli(cli).unwrap();

        let hint = pipeline::RetryPolicy::Retryable {
            after: Some(Duration::from_secs(600)),
        };
        assert_eq!(config.schedule.delay_after(0, &hint), Duration::from_secs(5));
    }

    #[test]
    fn zero_pacing_disables_the_delay() {
        let mut cli = parse(&["exposure", "--gemini-pacing-secs", "0", "classify"]);
        cli.gemini_api_key = Some("key".into());

        let config = AppConfig::from_cli(cli).unwrap();

        assert!(matches!(
            config.provider,
            ProviderSettings::Gemini { pacing: None, .. }
        ));
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
    }

    #[test]
    fn debug_output_hides_the_key() {
        let settings = ProviderSettings::OpenAi {
            api_key: "sk-secret".into(),
            model: "gpt-4o-mini".into(),
        };
        assert!(!format!("{settings:?}").contains("sk-secret"));
    }
}
