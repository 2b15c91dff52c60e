//! HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use pipeline::ProviderError;
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::error;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors raised while constructing a provider (not while calling it).
#[derive(Debug, Error)]
pub enum LlmError {
    /// The HTTP client could not be built (TLS backend initialisation).
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> ProviderError {
    error!(provider, error = %err, "HTTP request failed");
    ProviderError::Transport {
        message: err.to_string(),
    }
}

/// Turns a non-success response into the matching [`ProviderError`] and
/// decodes a success body into `T`.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;

    if !status.is_success() {
        let message = error_message(&body);
        error!(provider, status = %status, error = %message, "API error");
        return Err(match status.as_u16() {
            429 => ProviderError::RateLimited {
                retry_after,
                message,
            },
            code if code >= 500 => ProviderError::Server {
                status: code,
                message,
            },
            code => ProviderError::Api {
                status: code,
                message,
            },
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        error!(provider, error = %e, "Failed to parse response envelope");
        ProviderError::UnexpectedResponse {
            message: format!("failed to parse response envelope: {e}"),
        }
    })
}

/// Both providers wrap errors as `{"error": {"message": ...}}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
