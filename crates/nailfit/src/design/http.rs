//! HTTP backend for an OpenAI-style image generation endpoint.
//!
//! Request: `POST {endpoint}` with `{prompt, size, n: 1, response_format}`.
//! Response: `data[0].b64_json` (decoded here) or `data[0].url` (downloaded).

use std::io::Read;
use std::time::Duration;

use base64::Engine as _;
use serde_json::{json, Value};

use super::generate::{GenerationError, ImageGenerator};
use super::prompt::PromptDescription;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "NAILFIT_API_KEY";

/// Largest response body accepted from the service or an image URL.
const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

/// Connection settings for [`HttpImageGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GenerationServiceConfig {
    pub endpoint: String,
    pub model: Option<String>,
    /// Requested output size, `"<w>x<h>"`.
    pub size: String,
    /// `"b64_json"` or `"url"`.
    pub response_format: String,
    pub timeout_ms: u64,
    /// Inline key; prefer the environment variable. Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_key_env: String,
}

impl Default for GenerationServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/images/generations".to_string(),
            model: None,
            size: "1024x1024".to_string(),
            response_format: "b64_json".to_string(),
            timeout_ms: 60_000,
            api_key: None,
            api_key_env: API_KEY_ENV.to_string(),
        }
    }
}

impl GenerationServiceConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err("generation.endpoint must be an http(s) URL".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("generation.timeout_ms must be > 0".to_string());
        }
        if !matches!(self.response_format.as_str(), "b64_json" | "url") {
            return Err("generation.response_format must be 'b64_json' or 'url'".to_string());
        }
        let valid_size = self
            .size
            .split_once('x')
            .is_some_and(|(w, h)| w.parse::<u32>().is_ok() && h.parse::<u32>().is_ok());
        if !valid_size {
            return Err("generation.size must look like '1024x1024'".to_string());
        }
        Ok(())
    }

    /// Inline key, else the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// [`ImageGenerator`] over HTTP.
pub struct HttpImageGenerator {
    agent: ureq::Agent,
    config: GenerationServiceConfig,
    api_key: String,
}

impl HttpImageGenerator {
    /// Build a client; fails when the config is invalid or no API key is found.
    pub fn new(config: GenerationServiceConfig) -> Result<Self, String> {
        config.validate()?;
        let api_key = config.resolve_api_key().ok_or_else(|| {
            format!(
                "no API key for the generation service (set {} or generation.api_key)",
                config.api_key_env
            )
        })?;
        let timeout = Duration::from_millis(config.timeout_ms.max(100));
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(concat!("nailfit/", env!("CARGO_PKG_VERSION")))
            .build();
        Ok(Self {
            agent,
            config,
            api_key,
        })
    }

    pub fn config(&self) -> &GenerationServiceConfig {
        &self.config
    }

    fn request_body(&self, prompt: &PromptDescription) -> Value {
        let mut body = json!({
            "prompt": prompt.text,
            "size": self.config.size,
            "n": 1,
            "response_format": self.config.response_format,
        });
        if let Some(model) = &self.config.model {
            body["model"] = Value::String(model.clone());
        }
        body
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, GenerationError> {
        let response = self.agent.get(url).call().map_err(generation_error_from_ureq)?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(bytes)
    }
}

impl ImageGenerator for HttpImageGenerator {
    fn generate(&self, prompt: &PromptDescription) -> Result<Vec<u8>, GenerationError> {
        tracing::debug!(position = %prompt.position, endpoint = %self.config.endpoint, "requesting design");
        let response = self
            .agent
            .post(&self.config.endpoint)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Accept", "application/json")
            .send_json(self.request_body(prompt))
            .map_err(generation_error_from_ureq)?;
        let body: Value = serde_json::from_reader(response.into_reader().take(MAX_BODY_BYTES))
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        match parse_image_payload(&body)? {
            ImagePayload::Bytes(bytes) => Ok(bytes),
            ImagePayload::Url(url) => self.download(&url),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ImagePayload {
    Bytes(Vec<u8>),
    Url(String),
}

/// Pull the first image out of a generation response.
pub(crate) fn parse_image_payload(body: &Value) -> Result<ImagePayload, GenerationError> {
    let first = body
        .get("data")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .ok_or_else(|| GenerationError::MalformedResponse("missing data[0]".to_string()))?;
    if let Some(b64) = first.get("b64_json").and_then(Value::as_str) {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| GenerationError::MalformedResponse(format!("b64_json: {e}")))?;
        return Ok(ImagePayload::Bytes(bytes));
    }
    if let Some(url) = first.get("url").and_then(Value::as_str) {
        return Ok(ImagePayload::Url(url.to_string()));
    }
    Err(GenerationError::MalformedResponse(
        "data[0] has neither b64_json nor url".to_string(),
    ))
}

fn generation_error_from_ureq(err: ureq::Error) -> GenerationError {
    match err {
        ureq::Error::Status(429, _) => GenerationError::Quota,
        ureq::Error::Status(code, _) => GenerationError::Status { code },
        ureq::Error::Transport(transport) => GenerationError::Transport(transport.to_string()),
    }
}
