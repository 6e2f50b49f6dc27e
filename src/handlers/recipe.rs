//! Recipe suggestion endpoint
//!
//! Handles GET /api/gpt by filling the grandma-chef prompt template from the
//! query string and relaying the completion text.

use crate::error::AppResult;
use crate::handlers::AppState;
use crate::providers::SamplingOverrides;
use axum::extract::{Query, State};
use serde::Deserialize;

/// Stand-in for a missing query parameter
///
/// Missing parameters are not rejected; the literal text goes to the model.
pub const MISSING_PARAM_PLACEHOLDER: &str = "null";

/// Sampling used for recipe suggestions
pub const RECIPE_SAMPLING: SamplingOverrides = SamplingOverrides {
    temperature: Some(0.7),
    max_tokens: Some(150),
};

/// Query parameters for GET /api/gpt
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeQuery {
    pub cuisine: Option<String>,
    pub flavour: Option<String>,
    pub category: Option<String>,
    pub specification: Option<String>,
}

impl RecipeQuery {
    /// Render the prompt sent to the completion model
    pub fn to_prompt(&self) -> String {
        let cuisine = or_placeholder(&self.cuisine);
        let flavour = or_placeholder(&self.flavour);
        let category = or_placeholder(&self.category);
        let specification = or_placeholder(&self.specification);

        format!(
            "You're an AI grandma chef with expertise in traditional {cuisine} cuisine. \
             I need your help! Can you suggest a dish with a {flavour} flavor that's perfect \
             for {category}? It should also meet the {specification}. Please share the name \
             of one dish that fits these criteria along with two fun facts about it. At this \
             stage DO NOT give the whole recipe of the dish."
        )
    }
}

fn or_placeholder(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING_PARAM_PLACEHOLDER)
}

/// GET /api/gpt handler
///
/// Returns the completion text unmodified. Upstream failures map through
/// [`crate::error::AppError`].
pub async fn handler(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> AppResult<String> {
    tracing::debug!(?query, "Received recipe request");

    let prompt = query.to_prompt();
    state.openai().chat_completion(&prompt, RECIPE_SAMPLING).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_all_parameters() {
        let query = RecipeQuery {
            cuisine: Some("Italian".to_string()),
            flavour: Some("spicy".to_string()),
            category: Some("dinner".to_string()),
            specification: Some("vegetarian".to_string()),
        };
        let prompt = query.to_prompt();
        assert!(prompt.contains("traditional Italian cuisine"));
        assert!(prompt.contains("a spicy flavor"));
        assert!(prompt.contains("perfect for dinner?"));
        assert!(prompt.contains("meet the vegetarian."));
    }

    #[test]
    fn test_prompt_is_single_line() {
        let prompt = RecipeQuery::default().to_prompt();
        assert!(!prompt.contains('\n'));
        assert!(prompt.starts_with("You're an AI grandma chef"));
        assert!(prompt.ends_with("DO NOT give the whole recipe of the dish."));
    }

    #[test]
    fn test_missing_parameters_use_placeholder() {
        let query = RecipeQuery {
            cuisine: Some("Thai".to_string()),
            ..RecipeQuery::default()
        };
        let prompt = query.to_prompt();
        assert!(prompt.contains("traditional Thai cuisine"));
        assert!(prompt.contains("a null flavor"));
        assert!(prompt.contains("perfect for null?"));
    }

    #[test]
    fn test_recipe_sampling_values() {
        assert_eq!(RECIPE_SAMPLING.temperature, Some(0.7));
        assert_eq!(RECIPE_SAMPLING.max_tokens, Some(150));
    }
}
