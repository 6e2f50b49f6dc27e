//! Image generation endpoints
//!
//! GET /api/dalle, /api/fal and /api/falfast all take a `prompt` query
//! parameter, clip it to [`MAX_PROMPT_CHARS`] and return the URL of the first
//! generated image as plain text.

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::providers::FalModel;
use axum::extract::{Query, State};
use serde::Deserialize;

/// Upper bound on prompt length forwarded to image services
pub const MAX_PROMPT_CHARS: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct PromptQuery {
    pub prompt: Option<String>,
}

impl PromptQuery {
    /// The prompt clipped to [`MAX_PROMPT_CHARS`]
    fn clipped(self) -> AppResult<String> {
        let prompt = self
            .prompt
            .ok_or_else(|| AppError::Validation("missing query parameter 'prompt'".to_string()))?;

        tracing::info!(prompt = %prompt, "Request received");
        Ok(truncate_chars(&prompt, MAX_PROMPT_CHARS).to_string())
    }
}

/// First `max` characters of `s`
///
/// Counts `char`s, so a multi-byte character is never split. Words may be.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// GET /api/dalle handler
pub async fn dalle(
    State(state): State<AppState>,
    Query(query): Query<PromptQuery>,
) -> AppResult<String> {
    let prompt = query.clipped()?;
    state.openai().generate_image(&prompt).await
}

/// GET /api/fal handler (Stable Cascade)
pub async fn fal(
    State(state): State<AppState>,
    Query(query): Query<PromptQuery>,
) -> AppResult<String> {
    generate_with(&state, FalModel::StableCascade, query).await
}

/// GET /api/falfast handler (Fast Lightning SDXL)
pub async fn falfast(
    State(state): State<AppState>,
    Query(query): Query<PromptQuery>,
) -> AppResult<String> {
    generate_with(&state, FalModel::FastLightningSdxl, query).await
}

async fn generate_with(
    state: &AppState,
    model: FalModel,
    query: PromptQuery,
) -> AppResult<String> {
    let prompt = query.clipped()?;
    let url = state.fal().generate(model, &prompt, None).await?;
    tracing::info!(model = model.id(), url = %url, "Image generated");
    Ok(url)
}
