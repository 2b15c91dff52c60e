//! Generic sequential driver for annotation jobs.
//!
//! [`JobRunner::run`] walks the input rows in order, issuing one gateway call
//! per row and waiting for it before moving on. Rows whose call fails are
//! either skipped and reported, or end the run, according to the
//! [`FailurePolicy`].

use pipeline::{Prompt, PromptStyle, ResponseSchema, SchemaError, StructuredRecord};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::gateway::{GatewayError, LlmGateway};

/// One kind of annotation: how to prompt for an input row and how to turn the
/// validated response into output rows.
pub trait AnnotationJob: Send + Sync {
    /// Row type read from the input table.
    type Input: Send + Sync;
    /// Row type written to the output table.
    type Output: Send;

    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Schema every response must match.
    fn schema(&self) -> &ResponseSchema;

    /// Human-readable label identifying `input` in logs and reports.
    fn describe(&self, input: &Self::Input) -> String;

    /// Builds the prompt for `input` in the given style.
    fn prompt(&self, style: PromptStyle, input: &Self::Input) -> Prompt;

    /// Converts a validated response into zero or more output rows.
    fn expand(
        &self,
        input: &Self::Input,
        record: &StructuredRecord,
    ) -> Result<Vec<Self::Output>, SchemaError>;
}

/// What to do with an item whose LLM call ultimately failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure, record it in [`JobReport::skipped`], and continue.
    #[default]
    Skip,
    /// Stop the run with [`JobError::ItemFailed`].
    Abort,
}

/// Why one item produced no output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemFailure {
    /// The gateway gave up on the call.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The response passed schema validation but could not be converted into rows.
    #[error("could not convert response: {0}")]
    Conversion(#[from] SchemaError),
}

/// An input item that produced no output rows because its call failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedItem {
    /// Position of the item in the input table (0-based).
    pub index: usize,
    /// Label from [`AnnotationJob::describe`].
    pub item: String,
    /// What went wrong.
    pub reason: ItemFailure,
}

/// Result of a completed job run.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport<T> {
    /// Output rows in input order.
    pub rows: Vec<T>,
    /// Items skipped under [`FailurePolicy::Skip`].
    pub skipped: Vec<SkippedItem>,
}

/// Errors that end a job run early.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    /// An item failed under [`FailurePolicy::Abort`].
    #[error("{job} aborted at item {index} ({item}): {source}")]
    ItemFailed {
        /// Job name.
        job: &'static str,
        /// Position of the failing item.
        index: usize,
        /// Label of the failing item.
        item: String,
        /// The failure.
        source: ItemFailure,
    },
}

/// Receives progress notifications while a job runs.
pub trait ProgressObserver: Send + Sync {
    /// Called once before the first item with the number of items.
    fn started(&self, _total: usize) {}
    /// Called after each item, whether it succeeded or was skipped.
    fn item_finished(&self, _item: &str) {}
    /// Called once after the last item.
    fn finished(&self) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Drives an [`AnnotationJob`] over a list of inputs.
#[derive(Debug, Clone)]
pub struct JobRunner {
    gateway: LlmGateway,
    policy: FailurePolicy,
}

impl JobRunner {
    /// Creates a runner that sends every call through `gateway`.
    pub fn new(gateway: LlmGateway, policy: FailurePolicy) -> Self {
        Self { gateway, policy }
    }

    /// Runs `job` over `inputs`, one call at a time.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::ItemFailed`] for the first failing item when the
    /// policy is [`FailurePolicy::Abort`]. Under [`FailurePolicy::Skip`] this
    /// never fails.
    #[instrument(skip_all, fields(job = job.name(), items = inputs.len()))]
    pub async fn run<J: AnnotationJob>(
        &self,
        job: &J,
        inputs: &[J::Input],
        progress: &dyn ProgressObserver,
    ) -> Result<JobReport<J::Output>, JobError> {
        let style = self.gateway.provider().prompt_style();
        let mut report = JobReport {
            rows: Vec::new(),
            skipped: Vec::new(),
        };

        progress.started(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let item = job.describe(input);
            let prompt = job.prompt(style, input);

            let outcome = match self.gateway.invoke(&prompt, job.schema()).await {
                Ok(record) => job.expand(input, &record).map_err(ItemFailure::from),
                Err(err) => Err(ItemFailure::from(err)),
            };

            match outcome {
                Ok(rows) => report.rows.extend(rows),
                Err(reason) => match self.policy {
                    FailurePolicy::Skip => {
                        warn!(index, item = %item, error = %reason, "Skipping item");
                        report.skipped.push(SkippedItem {
                            index,
                            item: item.clone(),
                            reason,
                        });
                    }
                    FailurePolicy::Abort => {
                        progress.finished();
                        return Err(JobError::ItemFailed {
                            job: job.name(),
                            index,
                            item,
                            source: reason,
                        });
                    }
                },
            }
            progress.item_finished(&item);
        }
        progress.finished();

        info!(
            rows = report.rows.len(),
            skipped = report.skipped.len(),
            "Job complete"
        );
        Ok(report)
    }
}
