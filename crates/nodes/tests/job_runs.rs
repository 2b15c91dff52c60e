//! Job runs against a canned provider, from input rows to output rows.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nodes::{
    AttemptFailure, ClassifyOccupations, FailurePolicy, GatewayError, GenerateTasks, ItemFailure,
    JobError, JobRunner, LlmGateway, NoProgress, ProgressObserver, RateTasks,
};
use pipeline::{
    ClassifiedOccupationRow, IndustryCategory, OccupationRow, OccupationTaskRow, OccupationTitle,
    Prompt, PromptStyle, ProviderError, ProviderOutput, ResponseSchema, RetrySchedule,
    StructuredProvider, TaskDescription,
};

/// Answers with the canned text registered for the item named in the prompt.
///
/// The item is the chat user message, or the last line of a text prompt.
/// Unknown items get a server error.
struct CannedProvider {
    style: PromptStyle,
    answers: HashMap<String, String>,
}

impl CannedProvider {
    fn new(style: PromptStyle, answers: &[(&str, &str)]) -> Self {
        Self {
            style,
            answers: answers
                .iter()
                .map(|(item, answer)| (item.to_string(), answer.to_string()))
                .collect(),
        }
    }
}

fn item_of(prompt: &Prompt) -> String {
    match prompt {
        Prompt::Text(text) => text.lines().last().unwrap_or_default().to_string(),
        Prompt::Chat(messages) => messages.last().map(|m| m.content.clone()).unwrap_or_default(),
    }
}

#[async_trait]
impl StructuredProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    fn model(&self) -> &str {
        "canned-1"
    }

    fn prompt_style(&self) -> PromptStyle {
        self.style
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        _schema: &ResponseSchema,
    ) -> Result<ProviderOutput, ProviderError> {
        match self.answers.get(&item_of(prompt)) {
            Some(answer) => Ok(ProviderOutput::Text(answer.clone())),
            None => Err(ProviderError::Server {
                status: 500,
                message: "no canned answer".into(),
            }),
        }
    }
}

fn runner(provider: CannedProvider, policy: FailurePolicy) -> JobRunner {
    let schedule = RetrySchedule::new(3, Duration::from_millis(1)).unwrap();
    JobRunner::new(LlmGateway::new(Arc::new(provider), schedule), policy)
}

fn occupation(title: &str) -> OccupationRow {
    OccupationRow {
        occupation_title: OccupationTitle::new(title).unwrap(),
    }
}

#[tokio::test(start_paused = true)]
async fn nurse_is_classified_into_life_sciences() {
    let provider = CannedProvider::new(
        PromptStyle::SingleText,
        &[("Nurse", r#"{"classification": "Life Sciences"}"#)],
    );

    let report = runner(provider, FailurePolicy::Skip)
        .run(&ClassifyOccupations::new(), &[occupation("Nurse")], &NoProgress)
        .await
        .unwrap();

    assert_eq!(
        report.rows,
        vec![ClassifiedOccupationRow {
            occupation_title: OccupationTitle::new("Nurse").unwrap(),
            industry_classification: IndustryCategory::LifeSciences,
        }]
    );
    assert!(report.skipped.is_empty());
}

#[tokio::test(start_paused = true)]
async fn pilot_tasks_become_one_row_each() {
    let provider = CannedProvider::new(
        PromptStyle::Chat,
        &[(
            "Pilot",
            r#"{"tasks": ["Pre-flight inspection", "Radio communication"]}"#,
        )],
    );

    let report = runner(provider, FailurePolicy::Skip)
        .run(&GenerateTasks::new(), &[occupation("Pilot")], &NoProgress)
        .await
        .unwrap();

    assert_eq!(report.rows.len(), 2);
    assert!(report
        .rows
        .iter()
        .all(|row| row.occupation_title.as_str() == "Pilot"));
    assert_eq!(report.rows[0].task.as_str(), "Pre-flight inspection");
    assert_eq!(report.rows[1].task.as_str(), "Radio communication");
}

#[tokio::test(start_paused = true)]
async fn ratings_are_matched_to_their_pairs() {
    let provider = CannedProvider::new(
        PromptStyle::Chat,
        &[
            ("Pilot - Radio communication", r#"{"rating": 3}"#),
            ("Pilot - Pre-flight inspection", r#"{"rating": 1}"#),
        ],
    );
    let inputs = ["Radio communication", "Pre-flight inspection"].map(|task| OccupationTaskRow {
        occupation_title: OccupationTitle::new("Pilot").unwrap(),
        task: TaskDescription::new(task).unwrap(),
    });

    let report = runner(provider, FailurePolicy::Skip)
        .run(&RateTasks::new(), &inputs, &NoProgress)
        .await
        .unwrap();

    let ratings: Vec<u8> = report.rows.iter().map(|r| r.rating.value()).collect();
    assert_eq!(ratings, [3, 1]);
}

#[tokio::test(start_paused = true)]
async fn failed_items_are_skipped_and_reported() {
    let provider = CannedProvider::new(
        PromptStyle::SingleText,
        &[
            ("Nurse", r#"{"classification": "Life Sciences"}"#),
            ("Welder", r#"{"classification": "Retail"}"#),
        ],
    );
    let inputs = [occupation("Nurse"), occupation("Welder"), occupation("Astronaut")];

    let report = runner(provider, FailurePolicy::Skip)
        .run(&ClassifyOccupations::new(), &inputs, &NoProgress)
        .await
        .unwrap();

    assert_eq!(report.rows.len(), 1);
    let skipped: Vec<(usize, &str)> = report
        .skipped
        .iter()
        .map(|s| (s.index, s.item.as_str()))
        .collect();
    assert_eq!(skipped, [(1, "Welder"), (2, "Astronaut")]);
    assert!(matches!(
        report.skipped[0].reason,
        ItemFailure::Gateway(GatewayError::Exhausted {
            last: AttemptFailure::Malformed(_),
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn abort_policy_stops_at_the_first_failure() {
    let provider = CannedProvider::new(PromptStyle::SingleText, &[]);
    let inputs = [occupation("Astronaut"), occupation("Nurse")];

    let err = runner(provider, FailurePolicy::Abort)
        .run(&ClassifyOccupations::new(), &inputs, &NoProgress)
        .await
        .unwrap_err();

    let JobError::ItemFailed { job, index, item, .. } = err;
    assert_eq!((job, index, item.as_str()), ("classify", 0, "Astronaut"));
}

#[derive(Default)]
struct CountingProgress {
    total: AtomicUsize,
    finished_items: Mutex<Vec<String>>,
}

impl ProgressObserver for CountingProgress {
    fn started(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn item_finished(&self, item: &str) {
        self.finished_items.lock().unwrap().push(item.to_string());
    }
}

#[tokio::test(start_paused = true)]
async fn progress_sees_every_item_including_skipped_ones() {
    let provider = CannedProvider::new(
        PromptStyle::SingleText,
        &[("Nurse", r#"{"classification": "Life Sciences"}"#)],
    );
    let progress = CountingProgress::default();

    runner(provider, FailurePolicy::Skip)
        .run(
            &ClassifyOccupations::new(),
            &[occupation("Nurse"), occupation("Astronaut")],
            &progress,
        )
        .await
        .unwrap();

    assert_eq!(progress.total.load(Ordering::SeqCst), 2);
    assert_eq!(*progress.finished_items.lock().unwrap(), ["Nurse", "Astronaut"]);
}
