//! Enumeration of the daily tasks of each occupation.

use pipeline::{
    OccupationRow, OccupationTaskRow, Prompt, PromptStyle, ResponseSchema, SchemaError,
    StructuredRecord, TaskDescription,
};
use tracing::debug;

use super::{styled_prompt, JSON_ONLY};
use crate::runner::AnnotationJob;

const FIELD: &str = "tasks";

const INSTRUCTIONS: &str = "please enumerate a full list of reasonable tasks that a person in \
     that occupation would need to perform on a daily basis. Consider the entire spectrum of \
     that individual's duties and responsibilities, both online (if applicable) and in person, \
     in formulating the tasks.";

/// Produces one output row per task the model lists for an occupation.
#[derive(Debug, Clone)]
pub struct GenerateTasks {
    schema: ResponseSchema,
}

impl Default for GenerateTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerateTasks {
    /// Creates the job with a schema expecting a list of task strings.
    pub fn new() -> Self {
        Self {
            schema: ResponseSchema::new("EnumeratedTasks").string_list_field(FIELD),
        }
    }
}

impl AnnotationJob for GenerateTasks {
    type Input = OccupationRow;
    type Output = OccupationTaskRow;

    fn name(&self) -> &'static str {
        "generate-tasks"
    }

    fn schema(&self) -> &ResponseSchema {
        &self.schema
    }

    fn describe(&self, input: &OccupationRow) -> String {
        input.occupation_title.to_string()
    }

    fn prompt(&self, style: PromptStyle, input: &OccupationRow) -> Prompt {
        let title = input.occupation_title.as_str();
        styled_prompt(
            style,
            || {
                format!(
                    "For the cross-industry occupation title below, {INSTRUCTIONS} \
                     {JSON_ONLY}\nThe occupation title is:\n{title}"
                )
            },
            &format!(
                "For the cross-industry occupation title given by the user, {INSTRUCTIONS} \
                 {JSON_ONLY}"
            ),
            title.to_string(),
        )
    }

    fn expand(
        &self,
        input: &OccupationRow,
        record: &StructuredRecord,
    ) -> Result<Vec<OccupationTaskRow>, SchemaError> {
        let tasks = record
            .string_list(FIELD)
            .ok_or_else(|| SchemaError::MissingField {
                field: FIELD.to_string(),
            })?;
        let listed = tasks.len();

        let rows: Vec<OccupationTaskRow> = tasks
            .into_iter()
            .filter_map(TaskDescription::new)
            .map(|task| OccupationTaskRow {
                occupation_title: input.occupation_title.clone(),
                task,
            })
            .collect();

        if rows.len() < listed {
            debug!(dropped = listed - rows.len(), "Dropped blank tasks");
        }
        Ok(rows)
    }
}
