//! LLM provider infrastructure adapters.
//!
//! Implements the [`pipeline::StructuredProvider`] trait for Google Gemini
//! ([`GeminiProvider`]) and OpenAI ([`OpenAiProvider`]). Additional providers
//! are added as new modules in this crate without any changes to the
//! `pipeline` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport, request formatting, response
//! envelope parsing, and HTTP status classification live here. Providers make
//! exactly one request per `generate` call; pacing and back-off are applied by
//! the gateway in the `nodes` crate, which sees only
//! [`pipeline::StructuredProvider`].

pub mod gemini;
mod http;
pub mod openai;

pub use gemini::{GeminiProvider, DEFAULT_GEMINI_MODEL, GEMINI_FREE_TIER_PACING};
pub use http::{LlmError, DEFAULT_TIMEOUT};
pub use openai::{OpenAiProvider, DEFAULT_OPENAI_MODEL};
