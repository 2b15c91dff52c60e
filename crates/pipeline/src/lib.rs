//! Core domain for occupation exposure annotation.
//!
//! This crate contains the domain values, table row types, response schema
//! descriptions, retry schedule, and the provider port trait. Infrastructure
//! crates implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`OccupationTitle`, `TaskDescription`, `RunId`) |
//! | [`types`] | Value types (`IndustryCategory`, `ExposureRating`) and table rows |
//! | [`schema`] | `ResponseSchema` and validated `StructuredRecord` |
//! | [`prompt`] | Prompt payloads and chat messages |
//! | [`provider`] | The `StructuredProvider` port |
//! | [`retry`] | Exponential back-off schedule |
//! | [`errors`] | Provider, schema, and run-level errors plus `RetryPolicy` |

pub mod errors;
pub mod identifiers;
pub mod prompt;
pub mod provider;
pub mod retry;
pub mod schema;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{AnnotatorError, ProviderError, RetryPolicy, SchemaError};
pub use identifiers::{EmptyValue, OccupationTitle, RunId, TaskDescription};
pub use prompt::{ChatMessage, Prompt, PromptStyle, Role};
pub use provider::{ProviderOutput, StructuredProvider};
pub use retry::{RetrySchedule, DEFAULT_MAX_HINT};
pub use schema::{FieldKind, FieldSpec, ResponseSchema, StructuredRecord};
pub use types::{
    ClassifiedOccupationRow, ExposureRating, IndustryCategory, OccupationRow, OccupationTaskRow,
    RatedTaskRow, RatingOutOfRange, TableRow,
};
