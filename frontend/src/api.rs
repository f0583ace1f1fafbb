use async_trait::async_trait;
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use shared::analysis::{AnalysisError, Timer, VisionModel};
use shared::config::{AnalyzerConfig, Credential};
use shared::gemini::{GenerateContentRequest, GenerateContentResponse};
use std::time::Duration;

/// Analyzer settings baked into the bundle by `build.rs`.
pub fn load_config() -> AnalyzerConfig {
    AnalyzerConfig::from_values(option_env!("GEMINI_API_KEY"), option_env!("GEMINI_MODEL"))
}

/// Calls Gemini `generateContent` straight from the browser.
pub struct GeminiClient {
    url: String,
    credential: Option<Credential>,
}

impl GeminiClient {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            url: config.generate_content_url(),
            credential: config.credential.clone(),
        }
    }
}

#[async_trait(?Send)]
impl VisionModel for GeminiClient {
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, AnalysisError> {
        let credential = self
            .credential
            .as_ref()
            .ok_or(AnalysisError::MissingCredential)?;

        let response = Request::post(&self.url)
            .header("x-goog-api-key", credential.expose())
            .json(request)
            .map_err(|e| AnalysisError::Transport(format!("Failed to build request: {}", e)))?
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        if !response.ok() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status { status, body });
        }

        let body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| AnalysisError::Transport(format!("Failed to parse response: {}", e)))?;
        let text = body.text().ok_or(AnalysisError::EmptyResponse)?;

        gloo_console::log!("Gemini response:", &text);
        Ok(text)
    }
}

pub struct BrowserTimer;

#[async_trait(?Send)]
impl Timer for BrowserTimer {
    async fn sleep(&self, duration: Duration) {
        TimeoutFuture::new(duration.as_millis() as u32).await;
    }
}
