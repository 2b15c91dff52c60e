//! Industry classification of occupation titles.

use pipeline::{
    ClassifiedOccupationRow, IndustryCategory, OccupationRow, Prompt, PromptStyle,
    ResponseSchema, SchemaError, StructuredRecord,
};

use super::{styled_prompt, JSON_ONLY};
use crate::runner::AnnotationJob;

const FIELD: &str = "classification";

/// Assigns each occupation one [`IndustryCategory`].
#[derive(Debug, Clone)]
pub struct ClassifyOccupations {
    schema: ResponseSchema,
    system_prompt: String,
}

impl Default for ClassifyOccupations {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifyOccupations {
    /// Creates the job with a schema restricted to the industry labels.
    pub fn new() -> Self {
        let labels = IndustryCategory::ALL.map(IndustryCategory::label);
        let schema = ResponseSchema::new("Classification").enum_field(FIELD, labels);
        let system_prompt = format!(
            "For the cross-industry occupation title given by the user, classify it into the \
             industry category it most closely fits into. The industry categories are:\n{}\n\
             If the occupation title does not closely fit into any of the categories, choose \
             'None of the above'. {JSON_ONLY}",
            category_list()
        );
        Self {
            schema,
            system_prompt,
        }
    }
}

fn category_list() -> String {
    IndustryCategory::ALL
        .iter()
        .map(|c| format!("- {}", c.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

impl AnnotationJob for ClassifyOccupations {
    type Input = OccupationRow;
    type Output = ClassifiedOccupationRow;

    fn name(&self) -> &'static str {
        "classify"
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
                    "For the cross-industry occupation title below, classify it into the \
                     industry category it most closely fits into. The industry categories \
                     are:\n{}\nIf the occupation title does not closely fit into any of the \
                     categories, choose 'None of the above'. {JSON_ONLY}\nThe occupation \
                     title is:\n{title}",
                    category_list()
                )
            },
            &self.system_prompt,
            title.to_string(),
        )
    }

    fn expand(
        &self,
        input: &OccupationRow,
        record: &StructuredRecord,
    ) -> Result<Vec<ClassifiedOccupationRow>, SchemaError> {
        let label = record.string(FIELD).ok_or_else(|| SchemaError::MissingField {
            field: FIELD.to_string(),
        })?;
        let industry =
            IndustryCategory::from_label(label).ok_or_else(|| SchemaError::NotAllowed {
                field: FIELD.to_string(),
                value: label.to_string(),
            })?;
        Ok(vec![ClassifiedOccupationRow {
            occupation_title: input.occupation_title.clone(),
            industry_classification: industry,
        }])
    }
}
