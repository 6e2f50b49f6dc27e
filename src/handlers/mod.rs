//! HTTP request handlers for the recipe-relay API

use crate::config::{Config, Credentials};
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::providers::{FalClient, OpenAiClient};
use std::sync::Arc;

pub mod health;
pub mod images;
pub mod metrics;
pub mod recipe;
pub mod submit;

/// Application state shared across all handlers
///
/// Holds the configuration and one client per upstream service.
/// Cloning is cheap: everything inside is an `Arc` or a pooled client handle.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    openai: OpenAiClient,
    fal: FalClient,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState from configuration and credentials
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the metrics registry cannot be built.
    pub fn new(config: Arc<Config>, credentials: Credentials) -> AppResult<Self> {
        let metrics = Arc::new(
            Metrics::new()
                .map_err(|e| AppError::Internal(format!("Failed to create metrics: {}", e)))?,
        );

        let openai = OpenAiClient::new(
            config.openai.clone(),
            credentials.openai_api_key,
            metrics.clone(),
        );
        let fal = FalClient::new(config.fal.clone(), credentials.fal_api_key, metrics.clone());

        Ok(Self {
            config,
            openai,
            fal,
            metrics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn openai(&self) -> &OpenAiClient {
        &self.openai
    }

    pub fn fal(&self) -> &FalClient {
        &self.fal
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
