//! Wires a job to its input and output tables.

use std::path::Path;

use anyhow::Context;
use nodes::{AnnotationJob, ClassifyOccupations, GenerateTasks, JobRunner, LlmGateway, RateTasks};
use pipeline::TableRow;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::args::Command;
use crate::config::AppConfig;
use crate::progress::BarProgress;

/// Runs the configured job end to end.
pub async fn execute(config: AppConfig, show_progress: bool) -> anyhow::Result<()> {
    let provider = config
        .provider
        .build()
        .with_context(|| format!("failed to set up the {} provider", config.provider.name()))?;
    info!(
        provider = provider.name(),
        model = provider.model(),
        max_attempts = config.schedule.max_attempts(),
        policy = ?config.failure_policy,
        "Provider ready"
    );
    let runner = JobRunner::new(LlmGateway::new(provider, config.schedule), config.failure_policy);

    match &config.command {
        Command::Classify { input, output } => {
            annotate(&runner, &ClassifyOccupations::new(), input, output, show_progress).await
        }
        Command::GenerateTasks { input, output } => {
            annotate(&runner, &GenerateTasks::new(), input, output, show_progress).await
        }
        Command::RateTasks { input, output } => {
            annotate(&runner, &RateTasks::new(), input, output, show_progress).await
        }
    }
}

async fn annotate<J>(
    runner: &JobRunner,
    job: &J,
    input: &Path,
    output: &Path,
    show_progress: bool,
) -> anyhow::Result<()>
where
    J: AnnotationJob,
    J::Input: TableRow + DeserializeOwned,
    J::Output: TableRow + Serialize,
{
    let inputs: Vec<J::Input> = tables::read_rows(input, <J::Input as TableRow>::COLUMNS)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let progress = BarProgress::new(job.name(), show_progress);
    let report = runner.run(job, &inputs, &progress).await?;

    tables::write_rows(output, <J::Output as TableRow>::COLUMNS, &report.rows)
        .with_context(|| format!("failed to write {}", output.display()))?;

    if !report.skipped.is_empty() {
        warn!(
            skipped = report.skipped.len(),
            total = inputs.len(),
            "Some items produced no output"
        );
    }
    println!("Data saved to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use async_trait::async_trait;
    use nodes::FailurePolicy;
    use pipeline::{
        Prompt, PromptStyle, ProviderError, ProviderOutput, ResponseSchema, RetrySchedule,
        StructuredProvider,
    };

    use super::*;

    /// Answers by schema name; the rating depends on the task in the prompt.
    struct CannedProvider;

    #[async_trait]
    impl StructuredProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned-1"
        }

        fn prompt_style(&self) -> PromptStyle {
            PromptStyle::SingleText
        }

        async fn generate(
            &self,
            prompt: &Prompt,
            schema: &ResponseSchema,
        ) -> Result<ProviderOutput, ProviderError> {
            let text = match prompt {
                Prompt::Text(text) => text.clone(),
                Prompt::Chat(messages) => messages
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            };
            let body = match schema.name() {
                "Classification" => r#"{"classification": "Life Sciences"}"#,
                "EnumeratedTasks" => {
                    r#"{"tasks": ["Pre-flight inspection", "Radio communication, VHF"]}"#
                }
                _ if text.contains("VHF") => r#"{"rating": 2}"#,
                _ => r#"{"rating": 4}"#,
            };
            Ok(ProviderOutput::Text(body.to_string()))
        }
    }

    fn runner() -> JobRunner {
        let gateway = LlmGateway::new(Arc::new(CannedProvider), RetrySchedule::default());
        JobRunner::new(gateway, FailurePolicy::Abort)
    }

    #[tokio::test]
    async fn classify_writes_one_row_per_title() {
        let dir = tempfile::tempdir().unwrap();
        let titles = dir.path().join("titles.csv");
        let industries = dir.path().join("out/industries.csv");
        fs::write(&titles, "occupation_title\nNurse\n").unwrap();

        annotate(&runner(), &ClassifyOccupations::new(), &titles, &industries, false)
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(&industries).unwrap(),
            "occupation_title,industry_classification\nNurse,Life Sciences\n"
        );
    }

    #[tokio::test]
    async fn generated_tasks_feed_the_rating_job() {
        let dir = tempfile::tempdir().unwrap();
        let titles = dir.path().join("titles.csv");
        let tasks = dir.path().join("tasks.csv");
        let ratings = dir.path().join("ratings.csv");
        fs::write(&titles, "occupation_title\nPilot\n").unwrap();
        let runner = runner();

        annotate(&runner, &GenerateTasks::new(), &titles, &tasks, false)
            .await
            .unwrap();
        annotate(&runner, &RateTasks::new(), &tasks, &ratings, false)
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(&tasks).unwrap(),
            "occupation_title,task\n\
             Pilot,Pre-flight inspection\n\
             Pilot,\"Radio communication, VHF\"\n"
        );
        assert_eq!(
            fs::read_to_string(&ratings).unwrap(),
            "occupation_title,task,rating\n\
             Pilot,Pre-flight inspection,4\n\
             Pilot,\"Radio communication, VHF\",2\n"
        );
    }

    #[tokio::test]
    async fn missing_input_column_fails_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let titles = dir.path().join("titles.csv");
        let ratings = dir.path().join("ratings.csv");
        fs::write(&titles, "occupation_title\nPilot\n").unwrap();

        let err = annotate(&runner(), &RateTasks::new(), &titles, &ratings, false)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("`task`"));
        assert!(!ratings.exists());
    }
}
