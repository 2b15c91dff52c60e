//! The three annotation jobs.
//!
//! Each job pairs a response schema with two prompt templates: a single text
//! prompt with the item embedded, and a system prompt that expects the item as
//! the user message.

mod classify;
mod rating;
mod tasks;

pub use classify::ClassifyOccupations;
pub use rating::RateTasks;
pub use tasks::GenerateTasks;

use pipeline::{ChatMessage, Prompt, PromptStyle};

const JSON_ONLY: &str = "Please respond only with valid JSON in the specified format.";

/// Builds the prompt for `style` from the two template variants.
fn styled_prompt(
    style: PromptStyle,
    single_text: impl FnOnce() -> String,
    system: &str,
    user: String,
) -> Prompt {
    match style {
        PromptStyle::SingleText => Prompt::Text(single_text()),
        PromptStyle::Chat => {
            Prompt::Chat(vec![ChatMessage::system(system), ChatMessage::user(user)])
        }
    }
}
