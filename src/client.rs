//! # Classification Service Client
//!
//! Client HTTP verso il servizio di inferenza remoto, trattato come endpoint
//! opaco con contratto di risposta fisso.
//!
//! ## Responsabilità:
//! - `PredictionService`: trait usato da `BatchSubmitter` (sostituibile nei test)
//! - `HttpPredictionClient`: implementazione `reqwest` con payload multipart
//! - Parsing rigoroso delle risposte: status non 2xx e body malformati
//!   diventano `SubmissionError`
//!
//! ## Endpoint:
//! - `POST /api/predict-batch`, campo ripetuto `images`, in ordine di selezione
//! - `POST /api/predict`, campo `image`
//! - `GET /api/health`

use crate::config::Config;
use crate::error::SubmissionError;
use crate::file_collector::SelectedFile;
use crate::models::{BatchResponse, ErrorBody, HealthStatus, PredictionResult, SinglePrediction};
use crate::submitter::BatchRequest;
use futures::future::{BoxFuture, FutureExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const BATCH_PATH: &str = "/api/predict-batch";
const SINGLE_PATH: &str = "/api/predict";
const HEALTH_PATH: &str = "/api/health";
const MAX_ERROR_CHARS: usize = 200;

/// Something that can classify a batch of images
pub trait PredictionService: Send + Sync {
    fn predict_batch<'a>(
        &'a self,
        request: &'a BatchRequest,
    ) -> BoxFuture<'a, Result<Vec<PredictionResult>, SubmissionError>>;
}

/// `reqwest` client for the classification service
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: Client,
    base_url: String,
}

impl HttpPredictionClient {
    pub fn new(config: &Config) -> Result<Self, SubmissionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send every file of the request as one multipart POST
    pub async fn send_batch(&self, request: &BatchRequest) -> Result<Vec<PredictionResult>, SubmissionError> {
        let mut form = Form::new();
        for file in request.files() {
            form = form.part("images", Self::file_part(file).await?);
        }

        debug!("POST {} with {} images", self.url(BATCH_PATH), request.len());
        let response = self.client.post(self.url(BATCH_PATH)).multipart(form).send().await?;
        let body: BatchResponse = Self::read_json(response).await?;
        Ok(body.results)
    }

    /// Classify one image through the single-image endpoint
    pub async fn predict_single(&self, file: &SelectedFile) -> Result<SinglePrediction, SubmissionError> {
        let form = Form::new().part("image", Self::file_part(file).await?);
        let response = self.client.post(self.url(SINGLE_PATH)).multipart(form).send().await?;
        Self::read_json(response).await
    }

    pub async fn health(&self) -> Result<HealthStatus, SubmissionError> {
        let response = self.client.get(self.url(HEALTH_PATH)).send().await?;
        Self::read_json(response).await
    }

    async fn file_part(file: &SelectedFile) -> Result<Part, SubmissionError> {
        let bytes = file.source().read().await.map_err(|source| SubmissionError::Payload {
            filename: file.name().to_string(),
            source,
        })?;

        let part = Part::bytes(bytes).file_name(file.name().to_string());
        if file.media_type().parse::<mime_guess::mime::Mime>().is_ok() {
            Ok(part.mime_str(file.media_type())?)
        } else {
            Ok(part)
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SubmissionError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(SubmissionError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

impl PredictionService for HttpPredictionClient {
    fn predict_batch<'a>(
        &'a self,
        request: &'a BatchRequest,
    ) -> BoxFuture<'a, Result<Vec<PredictionResult>, SubmissionError>> {
        self.send_batch(request).boxed()
    }
}

/// Extract the `error` field of a failure body, or a trimmed copy of the raw text
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_CHARS).collect()
}
