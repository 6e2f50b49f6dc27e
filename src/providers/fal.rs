//! fal.ai queue client
//!
//! Generation on fal runs as a queued job:
//!
//! 1. `POST {base}/{model}` submits the input and returns a `request_id`
//! 2. `GET .../requests/{id}/status?logs=1` is polled until `COMPLETED`;
//!    any status outside the known set fails the job
//! 3. `GET .../requests/{id}` returns the model output
//!
//! Every status poll is forwarded to an optional [`UpdateSink`]. Passing
//! `None` drops the updates.

use super::decode_response;
use crate::config::FalConfig;
use crate::error::{AppError, AppResult};
use crate::metrics::{Metrics, Outcome, Service};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

const SERVICE: &str = "fal";

/// Receiver side of queue progress updates
pub type UpdateSink = mpsc::UnboundedSender<QueueUpdate>;

/// Queue job state as reported by fal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    InQueue,
    InProgress,
    Completed,
    /// Anything else fal reports, such as `CANCELLED`
    #[serde(other)]
    Unknown,
}

/// A log line emitted by the model while the job runs
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueueLog {
    pub message: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// One status poll, as delivered to an [`UpdateSink`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueUpdate {
    pub request_id: String,
    pub status: QueueStatus,
    pub queue_position: Option<u32>,
    pub logs: Vec<QueueLog>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    request_id: String,
    #[serde(default)]
    status_url: Option<String>,
    #[serde(default)]
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: QueueStatus,
    #[serde(default)]
    queue_position: Option<u32>,
    #[serde(default)]
    logs: Option<Vec<QueueLog>>,
}

/// Image models exposed over HTTP
///
/// Each variant owns its model id and fixed input parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FalModel {
    /// `fal-ai/stable-cascade`, served at `/api/fal`
    StableCascade,
    /// `fal-ai/fast-lightning-sdxl`, served at `/api/falfast`
    FastLightningSdxl,
}

impl FalModel {
    pub fn id(&self) -> &'static str {
        match self {
            FalModel::StableCascade => "fal-ai/stable-cascade",
            FalModel::FastLightningSdxl => "fal-ai/fast-lightning-sdxl",
        }
    }

    /// Build the fixed input payload for this model
    pub fn input(&self, prompt: &str) -> FalInput {
        match self {
            FalModel::StableCascade => FalInput::StableCascade(StableCascadeInput {
                prompt: prompt.to_string(),
                negative_prompt: String::new(),
                first_stage_steps: 20,
                second_stage_steps: 10,
                guidance_scale: 4.0,
                image_size: "square_hd",
                num_images: 1,
                loras: Vec::new(),
                enable_safety_checker: true,
            }),
            FalModel::FastLightningSdxl => FalInput::FastLightningSdxl(FastLightningSdxlInput {
                prompt: prompt.to_string(),
                image_size: "square_hd",
                // fal's schema takes the step count as a string enum
                num_inference_steps: "4",
                num_images: 1,
                enable_safety_checker: true,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StableCascadeInput {
    pub prompt: String,
    pub negative_prompt: String,
    pub first_stage_steps: u32,
    pub second_stage_steps: u32,
    pub guidance_scale: f64,
    pub image_size: &'static str,
    pub num_images: u32,
    pub loras: Vec<serde_json::Value>,
    pub enable_safety_checker: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FastLightningSdxlInput {
    pub prompt: String,
    pub image_size: &'static str,
    pub num_inference_steps: &'static str,
    pub num_images: u32,
    pub enable_safety_checker: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FalInput {
    StableCascade(StableCascadeInput),
    FastLightningSdxl(FastLightningSdxlInput),
}

/// Output shared by fal's text-to-image models
#[derive(Debug, Clone, Deserialize)]
pub struct ImageOutput {
    pub images: Vec<FalImage>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub has_nsfw_concepts: Option<Vec<bool>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FalImage {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl ImageOutput {
    /// URL of the first image; an empty list is an error
    pub fn into_first_url(self) -> AppResult<String> {
        self.images
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or(AppError::EmptyResult { service: SERVICE })
    }
}

/// Client for the fal queue API
#[derive(Clone)]
pub struct FalClient {
    http: reqwest::Client,
    config: FalConfig,
    api_key: Option<String>,
    metrics: Arc<Metrics>,
}

impl FalClient {
    pub fn new(config: FalConfig, api_key: Option<String>, metrics: Arc<Metrics>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            api_key,
            metrics,
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(reqwest::header::AUTHORIZATION, format!("Key {}", key)),
            None => builder,
        }
    }

    fn request_url(&self, model_id: &str, request_id: &str) -> String {
        format!(
            "{}/{}/requests/{}",
            self.config.base_url.trim_end_matches('/'),
            model_id,
            request_id
        )
    }

    /// Generate one image with `model` and return its URL
    pub async fn generate(
        &self,
        model: FalModel,
        prompt: &str,
        updates: Option<UpdateSink>,
    ) -> AppResult<String> {
        let output: ImageOutput = self
            .subscribe(model.id(), &model.input(prompt), updates)
            .await?;

        tracing::debug!(
            model = model.id(),
            image_count = output.images.len(),
            seed = ?output.seed,
            "fal generation finished"
        );

        output.into_first_url()
    }

    /// Submit `input` to the queue, wait for completion and decode the result
    pub async fn subscribe<I, O>(
        &self,
        model_id: &str,
        input: &I,
        updates: Option<UpdateSink>,
    ) -> AppResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let start = Instant::now();
        let result = self.run_job(model_id, input, updates.as_ref()).await;

        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(e) => {
                tracing::warn!(model = model_id, error = %e, "fal job failed");
                Outcome::Failure
            }
        };
        self.metrics
            .record_upstream(Service::Fal, outcome, start.elapsed());

        result
    }

    async fn run_job<I, O>(
        &self,
        model_id: &str,
        input: &I,
        updates: Option<&UpdateSink>,
    ) -> AppResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let submit_url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            model_id
        );
        let response = self
            .authorized(self.http.post(&submit_url))
            .json(input)
            .send()
            .await
            .map_err(|source| AppError::UpstreamTransport {
                service: SERVICE,
                source,
            })?;
        let submitted: SubmitResponse = decode_response(SERVICE, response).await?;

        if submitted.request_id.is_empty() {
            return Err(AppError::QueueFailed {
                model: model_id.to_string(),
                reason: "queue returned an empty request_id".to_string(),
            });
        }

        let request_id = submitted.request_id;
        let status_url = submitted
            .status_url
            .unwrap_or_else(|| format!("{}/status", self.request_url(model_id, &request_id)));
        let response_url = submitted
            .response_url
            .unwrap_or_else(|| self.request_url(model_id, &request_id));

        tracing::debug!(model = model_id, request_id = %request_id, "fal job queued");

        loop {
            let response = self
                .authorized(self.http.get(&status_url))
                .query(&[("logs", "1")])
                .send()
                .await
                .map_err(|source| AppError::UpstreamTransport {
                    service: SERVICE,
                    source,
                })?;
            let polled: StatusResponse = decode_response(SERVICE, response).await?;
            let status = polled.status;

            if let Some(sink) = updates {
                // A dropped receiver only means nobody is listening anymore
                let _ = sink.send(QueueUpdate {
                    request_id: request_id.clone(),
                    status,
                    queue_position: polled.queue_position,
                    logs: polled.logs.unwrap_or_default(),
                });
            }

            match status {
                QueueStatus::Completed => break,
                // fal's terminal states other than COMPLETED (e.g. CANCELLED)
                // all land here; none of them will ever produce a result
                QueueStatus::Unknown => {
                    return Err(AppError::QueueFailed {
                        model: model_id.to_string(),
                        reason: format!("job {} left the queue without completing", request_id),
                    });
                }
                QueueStatus::InQueue | QueueStatus::InProgress => {}
            }

            tokio::time::sleep(self.config.poll_interval()).await;
        }

        let response = self
            .authorized(self.http.get(&response_url))
            .send()
            .await
            .map_err(|source| AppError::UpstreamTransport {
                service: SERVICE,
                source,
            })?;
        decode_response(SERVICE, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_cascade_input_shape() {
        let json = serde_json::to_value(FalModel::StableCascade.input("a lemon tart")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prompt": "a lemon tart",
                "negative_prompt": "",
                "first_stage_steps": 20,
                "second_stage_steps": 10,
                "guidance_scale": 4.0,
                "image_size": "square_hd",
                "num_images": 1,
                "loras": [],
                "enable_safety_checker": true
            })
        );
    }

    #[test]
    fn test_fast_lightning_input_sends_steps_as_string() {
        let json =
            serde_json::to_value(FalModel::FastLightningSdxl.input("dumplings")).unwrap();
        assert_eq!(json["num_inference_steps"], "4");
        assert_eq!(json["image_size"], "square_hd");
        assert_eq!(json["enable_safety_checker"], true);
        assert!(json.get("guidance_scale").is_none());
    }

    #[test]
    fn test_model_ids() {
        assert_eq!(FalModel::StableCascade.id(), "fal-ai/stable-cascade");
        assert_eq!(FalModel::FastLightningSdxl.id(), "fal-ai/fast-lightning-sdxl");
    }

    #[test]
    fn test_queue_status_parses_known_and_unknown() {
        let status: QueueStatus = serde_json::from_str(r#""IN_PROGRESS""#).unwrap();
        assert_eq!(status, QueueStatus::InProgress);
        let status: QueueStatus = serde_json::from_str(r#""CANCELLED""#).unwrap();
        assert_eq!(status, QueueStatus::Unknown);
    }

    #[test]
    fn test_first_url_of_empty_output_is_error() {
        let output: ImageOutput = serde_json::from_str(r#"{"images": []}"#).unwrap();
        assert!(matches!(
            output.into_first_url(),
            Err(AppError::EmptyResult { service: "fal" })
        ));
    }

    #[test]
    fn test_first_url_picks_first_image() {
        let output: ImageOutput = serde_json::from_str(
            r#"{"images": [{"url": "https://a/1.png", "width": 1024}, {"url": "https://a/2.png"}], "seed": 7}"#,
        )
        .unwrap();
        assert_eq!(output.into_first_url().unwrap(), "https://a/1.png");
    }
}
