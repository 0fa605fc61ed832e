//! Gemini `generateContent` adapter
//!
//! Everything upstream talks to the [`GenerativeModel`] trait; [`GeminiClient`]
//! is the only implementation that touches the network.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::AppConfig;
use crate::models::AppError;

type Result<T> = std::result::Result<T, AppError>;

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// One page of a syllabus, ready to be sent as `inline_data`
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePart {
    pub mime_type: String,
    /// Base64 payload without the data-URL header
    pub data: String,
}

impl ImagePart {
    /// Accepts `data:<mime>;base64,<payload>` or bare base64 (assumed JPEG).
    pub fn from_data_url(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (mime_type, data) = match raw.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest
                    .split_once(',')
                    .ok_or_else(|| AppError::validation("Imagen de temario sin datos."))?;
                let mime = header.split(';').next().unwrap_or_default();
                let mime = if mime.is_empty() { DEFAULT_IMAGE_MIME } else { mime };
                (mime.to_string(), payload.trim())
            }
            None => (DEFAULT_IMAGE_MIME.to_string(), raw),
        };

        if data.is_empty() {
            return Err(AppError::validation("Imagen de temario vacía."));
        }
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| AppError::validation(format!("Imagen de temario inválida: {}", e)))?;

        Ok(Self {
            mime_type,
            data: data.to_string(),
        })
    }

    /// Encode raw file bytes, e.g. a scanned page read from disk.
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// A single-turn structured generation request
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub images: Vec<ImagePart>,
    /// Gemini `responseSchema`; JSON output is requested either way
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_images(mut self, images: Vec<ImagePart>) -> Self {
        self.images = images;
        self
    }
}

/// The generative service as seen by the pipelines
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Raw text of the answer; JSON recovery happens upstream.
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    /// Fails with a configuration error when no API key is set.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let http = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| AppError::configuration(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let url = build_gemini_url(&self.base_url, &self.model, &self.api_key);
        let body = build_gemini_request_body(&request, self.temperature, self.max_output_tokens);
        debug!(
            "[Gemini] generateContent model={} images={} schema={}",
            self.model,
            request.images.len(),
            request.response_schema.is_some()
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(AppError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::with_details(
                crate::models::AppErrorType::LLM,
                format!("Gemini API error: {}", status),
                json!({ "status": status.as_u16(), "body": error_text }),
            ));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| AppError::malformed(format!("Failed to parse Gemini response: {}", e)))?;

        extract_text(&response_json)
    }
}

/// Build the Gemini API URL
fn build_gemini_url(base_url: &str, model: &str, api_key: &str) -> String {
    format!(
        "{}/v1beta/models/{}:generateContent?key={}",
        base_url.trim_end_matches('/'),
        model,
        api_key
    )
}

/// Text part first, then one `inline_data` part per image.
pub(crate) fn build_gemini_request_body(
    request: &GenerationRequest,
    temperature: f32,
    max_output_tokens: u32,
) -> Value {
    let mut parts = vec![json!({ "text": request.prompt })];
    for image in &request.images {
        parts.push(json!({
            "inline_data": {
                "mime_type": image.mime_type,
                "data": image.data
            }
        }));
    }

    let mut generation_config = json!({
        "temperature": temperature,
        "maxOutputTokens": max_output_tokens,
        "responseMimeType": "application/json",
    });
    if let Some(schema) = &request.response_schema {
        generation_config["responseSchema"] = schema.clone();
    }

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": generation_config
    })
}

/// Concatenate every text part of the first candidate.
pub(crate) fn extract_text(response: &Value) -> Result<String> {
    if let Some(reason) = response
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(AppError::llm(format!("Gemini blocked the prompt: {}", reason)));
    }

    let text: String = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AppError::malformed("Gemini returned an empty answer"));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_keeps_mime_and_payload() {
        let part = ImagePart::from_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(part.mime_type, "image/png");
        assert_eq!(part.data, "aGVsbG8=");

        let bare = ImagePart::from_data_url("aGVsbG8=").unwrap();
        assert_eq!(bare.mime_type, "image/jpeg");
    }

    #[test]
    fn broken_images_are_validation_errors() {
        assert!(ImagePart::from_data_url("data:image/png;base64").is_err());
        assert!(ImagePart::from_data_url("data:image/png;base64,").is_err());
        assert!(ImagePart::from_data_url("no es base64!!").is_err());
    }

    #[test]
    fn body_without_images_has_only_text() {
        let req = GenerationRequest::text("Genera el temario").with_schema(json!({"type": "OBJECT"}));
        let body = build_gemini_request_body(&req, 0.7, 1024);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn text_parts_are_concatenated() {
        let resp = json!({"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]});
        assert_eq!(extract_text(&resp).unwrap(), "{\"a\":1}");
        assert!(extract_text(&json!({"candidates": []})).is_err());
    }
}
