//! AI-exposure rating of occupation tasks.

use pipeline::{
    ExposureRating, OccupationTaskRow, Prompt, PromptStyle, RatedTaskRow, ResponseSchema,
    SchemaError, StructuredRecord,
};

use super::{styled_prompt, JSON_ONLY};
use crate::runner::AnnotationJob;

const FIELD: &str = "rating";

const RUBRIC: &str = "rate the task's exposure to AI automation from 1-5. The ratings have the \
     following interpretations:\n\
     - 1: AI cannot perform the task at all\n\
     - 2: AI can perform the task with assistance from a human operator\n\
     - 3: AI can perform the task as well as an average human\n\
     - 4: AI can perform the task as well as an expert human\n\
     - 5: AI can perform the task better than an expert human\n\
     Consider the entire spectrum of that occupation's duties and responsibilities, both online \
     (if applicable) and in person, in formulating the ratings. Also consider the legal, \
     physical, and emotional requirements of the task. Most tasks that require a physical \
     presence should be rated 1.";

/// Rates each (occupation, task) pair on the 1–5 exposure scale.
#[derive(Debug, Clone)]
pub struct RateTasks {
    schema: ResponseSchema,
}

impl Default for RateTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl RateTasks {
    /// Creates the job with a schema accepting ratings from 1 to 5.
    pub fn new() -> Self {
        Self {
            schema: ResponseSchema::new("TaskRating").integer_field(
                FIELD,
                Some(ExposureRating::MIN),
                Some(ExposureRating::MAX),
            ),
        }
    }
}

impl AnnotationJob for RateTasks {
    type Input = OccupationTaskRow;
    type Output = RatedTaskRow;

    fn name(&self) -> &'static str {
        "rate-tasks"
    }

    fn schema(&self) -> &ResponseSchema {
        &self.schema
    }

    fn describe(&self, input: &OccupationTaskRow) -> String {
        format!("{} - {}", input.occupation_title, input.task)
    }

    fn prompt(&self, style: PromptStyle, input: &OccupationTaskRow) -> Prompt {
        let pair = self.describe(input);
        styled_prompt(
            style,
            || {
                format!(
                    "For the cross-industry occupation title and specific task below, {RUBRIC} \
                     {JSON_ONLY}\nThe occupation title and task are:\n{pair}"
                )
            },
            &format!(
                "For the cross-industry occupation title and specific task given by the user, \
                 {RUBRIC} {JSON_ONLY}"
            ),
            pair.clone(),
        )
    }

    fn expand(
        &self,
        input: &OccupationTaskRow,
        record: &StructuredRecord,
    ) -> Result<Vec<RatedTaskRow>, SchemaError> {
        let value = record.integer(FIELD).ok_or_else(|| SchemaError::MissingField {
            field: FIELD.to_string(),
        })?;
        let rating = ExposureRating::new(value).ok_or_else(|| SchemaError::OutOfRange {
            field: FIELD.to_string(),
            value,
        })?;
        Ok(vec![RatedTaskRow {
            occupation_title: input.occupation_title.clone(),
            task: input.task.clone(),
            rating,
        }])
    }
}
