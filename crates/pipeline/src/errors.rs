//! Error and retry-policy types shared across the workspace.
//!
//! [`ProviderError`] and [`SchemaError`] are the two failure classes of a
//! single LLM call: the provider itself failed, or it answered with output
//! that does not match the requested schema. [`AnnotatorError`] covers the
//! conditions that stop a run before any item is processed.
//!
//! [`RetryPolicy`] is a cross-cutting concern: a provider error says whether
//! repeating the call can help and how long to wait at minimum.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: connection failures, timeouts, server errors,
///   rate-limit responses, unexpected response envelopes.
/// - `NonRetryable` errors: rejected requests and credentials (HTTP 400, 401,
///   403, 404), where repeating the identical call cannot succeed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt (e.g. from a `Retry-After`
        /// header). `None` means apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Provider failures
// ---------------------------------------------------------------------------

/// A failure raised by the provider call itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("Connection error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The provider answered with a 5xx status.
    #[error("Server error [{status}]: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Error body returned by the provider.
        message: String,
    },

    /// The provider rejected the request because of a quota.
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Delay requested by the provider, when it sent one.
        retry_after: Option<Duration>,
        /// Error body returned by the provider.
        message: String,
    },

    /// The provider answered with a non-success status other than 429 or 5xx.
    #[error("API error [{status}]: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error body returned by the provider.
        message: String,
    },

    /// The model declined to answer.
    #[error("Model refused the request: {reason}")]
    Refusal {
        /// Refusal text returned by the model.
        reason: String,
    },

    /// The HTTP call succeeded but the envelope did not contain generated content.
    #[error("Unexpected provider response: {message}")]
    UnexpectedResponse {
        /// What was missing or malformed.
        message: String,
    },
}

impl ProviderError {
    /// Classifies the error for the retry loop.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            ProviderError::RateLimited { retry_after, .. } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            ProviderError::Api { status, .. } if matches!(status, 400 | 401 | 403 | 404) => {
                RetryPolicy::NonRetryable
            }
            _ => RetryPolicy::Retryable { after: None },
        }
    }
}

// ---------------------------------------------------------------------------
// Malformed output
// ---------------------------------------------------------------------------

/// The provider call succeeded but its output does not match the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The output is not syntactically valid JSON.
    #[error("JSON decode error: {message}")]
    InvalidJson {
        /// Parser diagnostic.
        message: String,
    },

    /// The output is valid JSON but not an object.
    #[error("expected a JSON object, found {found}")]
    NotAnObject {
        /// JSON type actually returned.
        found: &'static str,
    },

    /// A required field is absent.
    #[error("missing field `{field}`")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// A field holds a value of the wrong JSON type.
    #[error("field `{field}` should be {expected}, found {found}")]
    WrongType {
        /// Name of the offending field.
        field: String,
        /// Expected type description.
        expected: &'static str,
        /// JSON type actually returned.
        found: &'static str,
    },

    /// A string field holds a value outside its enumerated set.
    #[error("field `{field}` has value {value:?}, which is not one of the permitted values")]
    NotAllowed {
        /// Name of the offending field.
        field: String,
        /// Value actually returned.
        value: String,
    },

    /// An integer field is outside its bounds.
    #[error("field `{field}` has value {value}, which is outside the permitted range")]
    OutOfRange {
        /// Name of the offending field.
        field: String,
        /// Value actually returned.
        value: i64,
    },
}

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// Errors that prevent an annotation run from starting.
#[derive(Debug, Error)]
pub enum AnnotatorError {
    /// The credential for the selected provider is not set.
    ///
    /// Produced at startup; no table is read and no call is made.
    #[error("Please provide a {variable} in the environment or a .env file")]
    MissingCredential {
        /// Name of the environment variable that was expected.
        variable: &'static str,
    },

    /// The runtime configuration is invalid.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}
