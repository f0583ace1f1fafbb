use crate::config::AnalyzerConfig;
use crate::extract::extract_json_object;
use crate::fallback::FallbackPicker;
use crate::gemini::{ANALYSIS_PROMPT, GenerateContentRequest, InlineData};
use crate::nutrition::{FoodAnalysis, ValidationError};
use crate::payload::ImagePayload;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Vision model API key is not configured")]
    MissingCredential,
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Model API error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Model returned no text")]
    EmptyResponse,
    #[error("No JSON found in response")]
    NoJsonObject,
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid response structure: {0}")]
    Invalid(#[from] ValidationError),
}

impl AnalysisError {
    /// Errors raised before any model text was received.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AnalysisError::Transport(_) | AnalysisError::Status { .. } | AnalysisError::EmptyResponse
        )
    }
}

/// A generative model that answers a single text + image request with text.
#[async_trait(?Send)]
pub trait VisionModel {
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, AnalysisError>;
}

#[async_trait(?Send)]
pub trait Timer {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug)]
pub enum AnalysisSource {
    Model,
    Fallback(AnalysisError),
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub analysis: FoodAnalysis,
    pub source: AnalysisSource,
}

impl AnalysisOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, AnalysisSource::Fallback(_))
    }
}

/// Extracts, parses and validates the first JSON object in raw model text.
pub fn parse_analysis(text: &str) -> Result<FoodAnalysis, AnalysisError> {
    let span = extract_json_object(text).ok_or(AnalysisError::NoJsonObject)?;
    let value: Value = serde_json::from_str(span)?;
    Ok(FoodAnalysis::from_value(value)?)
}

/// Turns an image into a nutrition record. Every failure resolves to a
/// canned record, so callers always get something to render.
pub struct AnalysisGateway<M, T> {
    config: AnalyzerConfig,
    model: M,
    timer: T,
    fallback: FallbackPicker,
}

impl<M: VisionModel, T: Timer> AnalysisGateway<M, T> {
    pub fn new(config: AnalyzerConfig, model: M, timer: T) -> Self {
        let fallback = FallbackPicker::new(config.fallback);
        Self {
            config,
            model,
            timer,
            fallback,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub async fn analyze(&self, image: ImagePayload) -> FoodAnalysis {
        self.analyze_detailed(image).await.analysis
    }

    pub async fn analyze_detailed(&self, image: ImagePayload) -> AnalysisOutcome {
        let image_id = image.id();
        log::info!(
            "Starting food analysis for image {} ({}, {} bytes)",
            image_id,
            image.mime_type(),
            image.len()
        );

        match self.request_analysis(image).await {
            Ok(analysis) => {
                log::info!("Image {} identified as {:?}", image_id, analysis.food_name);
                AnalysisOutcome {
                    analysis,
                    source: AnalysisSource::Model,
                }
            }
            Err(err) => {
                let delay = match &err {
                    AnalysisError::MissingCredential => {
                        log::warn!("Gemini API key not configured, using fallback data");
                        self.config.credential_delay
                    }
                    err if err.is_transport() => {
                        log::error!("Error analyzing image {}: {}", image_id, err);
                        self.config.failure_delay
                    }
                    err => {
                        log::error!("Error parsing model response for image {}: {}", image_id, err);
                        Duration::ZERO
                    }
                };

                if !delay.is_zero() {
                    self.timer.sleep(delay).await;
                }

                AnalysisOutcome {
                    analysis: self.fallback.pick(),
                    source: AnalysisSource::Fallback(err),
                }
            }
        }
    }

    async fn request_analysis(&self, image: ImagePayload) -> Result<FoodAnalysis, AnalysisError> {
        if !self.config.has_credential() {
            return Err(AnalysisError::MissingCredential);
        }

        let request = GenerateContentRequest::with_image(ANALYSIS_PROMPT, InlineData::from(&image));
        drop(image);

        let text = self.model.generate(&request).await?;
        log::debug!("Model response: {}", text);

        parse_analysis(&text).inspect_err(|_| log::error!("Raw response: {}", text))
    }
}
