use crate::fallback::FallbackPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Value shipped in `.env.example`; treated the same as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A usable API key. Absent, blank and placeholder keys never become one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn from_raw(raw: Option<&str>) -> Option<Self> {
        let key = raw?.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            return None;
        }
        Some(Credential(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub credential: Option<Credential>,
    pub model: String,
    pub endpoint: String,
    /// Pause before serving a canned record when no key is configured, so
    /// the analyzing state stays visible.
    #[serde(with = "millis")]
    pub credential_delay: Duration,
    /// Pause before serving a canned record after a transport or model error.
    #[serde(with = "millis")]
    pub failure_delay: Duration,
    pub fallback: FallbackPolicy,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            credential: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credential_delay: Duration::from_millis(1500),
            failure_delay: Duration::from_millis(1000),
            fallback: FallbackPolicy::Random,
        }
    }
}

impl AnalyzerConfig {
    /// Builds a config from raw key/model values, typically the compile-time
    /// environment of the WASM bundle.
    pub fn from_values(api_key: Option<&str>, model: Option<&str>) -> Self {
        let mut config = Self {
            credential: Credential::from_raw(api_key),
            ..Self::default()
        };
        if let Some(model) = model.map(str::trim).filter(|m| !m.is_empty()) {
            config.model = model.to_string();
        }
        config
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
