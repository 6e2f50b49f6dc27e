//! Free-form prompt endpoint
//!
//! Handles POST /submit. Unlike the other routes this one never exposes the
//! underlying error: every failure is logged and replaced with a fixed body.

use crate::handlers::AppState;
use crate::providers::SamplingOverrides;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Body returned for any failure on this route
pub const SUBMIT_FAILURE_MESSAGE: &str = "Failed to generate output. Please try again.";

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub input: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitResponse {
    pub gpt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitError {
    pub error: String,
}

fn failure() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(SubmitError {
            error: SUBMIT_FAILURE_MESSAGE.to_string(),
        }),
    )
        .into_response()
}

/// POST /submit handler
///
/// Forwards `input` with the configured default sampling. A malformed body
/// is treated the same as an upstream failure.
pub async fn handler(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::error!(error = %rejection.body_text(), "Error: invalid submit body");
            return failure();
        }
    };

    tracing::debug!(input_length = request.input.len(), "Received submit request");

    match state
        .openai()
        .chat_completion(&request.input, SamplingOverrides::default())
        .await
    {
        Ok(gpt) => Json(SubmitResponse { gpt }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Error: submit completion failed");
            failure()
        }
    }
}
