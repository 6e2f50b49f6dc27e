//! Clients for the upstream generative AI services
//!
//! Each client is constructed once at startup from explicit configuration
//! and credentials, then shared across handlers. Every payload coming back
//! is decoded into a typed schema here so shape changes upstream surface as
//! [`AppError::UpstreamDecode`] instead of a panic in a handler.

pub mod fal;
pub mod openai;

pub use fal::{FalClient, FalModel, QueueStatus, QueueUpdate, UpdateSink};
pub use openai::{OpenAiClient, SamplingOverrides};

use crate::error::{AppError, AppResult};
use serde::de::DeserializeOwned;

/// Upstream error bodies are clipped to this many characters in errors and logs
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Check status and decode a JSON body into `T`
async fn decode_response<T: DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> AppResult<T> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|source| AppError::UpstreamTransport { service, source })?;

    if !status.is_success() {
        let body: String = String::from_utf8_lossy(&bytes)
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect();
        return Err(AppError::UpstreamStatus {
            service,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_slice(&bytes).map_err(|e| AppError::UpstreamDecode {
        service,
        reason: e.to_string(),
    })
}
