//! Annotation job implementations and the LLM gateway.
//!
//! This crate provides the three annotation jobs (industry classification,
//! task generation, task rating), the [`JobRunner`] that drives a job over a
//! table of inputs, and the [`LlmGateway`] that wraps every LLM call with
//! pacing, schema validation, and bounded exponential back-off.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Jobs sequence calls between the domain types in
//! the [`pipeline`] crate and the [`pipeline::StructuredProvider`] port. They
//! perform no file or network I/O of their own.

pub mod gateway;
pub mod jobs;
pub mod runner;

pub use gateway::{AttemptFailure, GatewayError, LlmGateway};
pub use jobs::{ClassifyOccupations, GenerateTasks, RateTasks};
pub use runner::{
    AnnotationJob, FailurePolicy, ItemFailure, JobError, JobReport, JobRunner, NoProgress,
    ProgressObserver, SkippedItem,
};
