use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("status={status} body={body}")] Status { status: u16, body: String },
    #[error("timed out after {0:?}")] Timeout(Duration),
    #[error("malformed model output: {0}")] MalformedOutput(String),
    #[error("no image data in response")] NoMedia,
    #[error("GEMINI_API_KEY is not configured")] MissingApiKey,
}

impl GeminiError {
    /// Failures worth a second attempt: transport errors, timeouts, quota and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            GeminiError::Http(_) | GeminiError::Timeout(_) => true,
            GeminiError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    Media { mime_type: String, data: String },
}

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub parts: Vec<PromptPart>,
    pub response_schema: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// The seam between the flows and a concrete generative model provider.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generates a structured response and returns it as parsed JSON.
    async fn generate_json(&self, request: &ModelRequest) -> Result<Value, GeminiError>;

    /// Generates an image; fails with [`GeminiError::NoMedia`] if none comes back.
    async fn generate_image(&self, request: &ModelRequest) -> Result<InlineImage, GeminiError>;
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

fn loggable(value: &Value) -> String {
    let mut copy = value.clone();
    truncate_base64_in_json(&mut copy);
    serde_json::to_string_pretty(&copy).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputMode {
    Json,
    Image,
}

fn build_request_body(request: &ModelRequest, mode: OutputMode) -> Value {
    let parts: Vec<Value> = request
        .parts
        .iter()
        .map(|p| match p {
            PromptPart::Text(text) => json!({ "text": text }),
            PromptPart::Media { mime_type, data } => json!({
                "inlineData": { "mimeType": mime_type, "data": data }
            }),
        })
        .collect();

    let generation_config = match mode {
        OutputMode::Json => {
            let mut cfg = json!({
                "responseMimeType": "application/json",
                "temperature": 0.4,
                "candidateCount": 1
            });
            if let Some(schema) = &request.response_schema {
                cfg["responseSchema"] = schema.clone();
            }
            cfg
        }
        OutputMode::Image => json!({
            "responseModalities": ["TEXT", "IMAGE"],
            "temperature": 0.4,
            "topP": 0.95,
            "topK": 64,
            "candidateCount": 1
        }),
    };

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": generation_config
    })
}

pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn perform_api_call(&self, model: &str, body: &Value) -> Result<GeminiResponse, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent?key={}", self.base_url, model, api_key);

        info!("🔗 Making request to: {}", url.replace(api_key, "***"));
        debug!("📤 Request body: {}", loggable(body));

        let response = self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            return Err(GeminiError::Status { status: status.as_u16(), body: response_text });
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::MalformedOutput(format!("parse error: {}", e)))?;

        if let Ok(value) = serde_json::from_str::<Value>(&response_text) {
            debug!("📥 Raw Gemini API response: {}", loggable(&value));
        }
        Ok(parsed)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_json(&self, request: &ModelRequest) -> Result<Value, GeminiError> {
        let body = build_request_body(request, OutputMode::Json);
        let response = self.perform_api_call(&request.model, &body).await?;
        let text = extract_text(&response)
            .ok_or_else(|| GeminiError::MalformedOutput("no text content found in response".into()))?;
        parse_json_output(&text)
    }

    async fn generate_image(&self, request: &ModelRequest) -> Result<InlineImage, GeminiError> {
        let body = build_request_body(request, OutputMode::Image);
        let response = self.perform_api_call(&request.model, &body).await?;
        let image = extract_first_image(&response).ok_or(GeminiError::NoMedia)?;
        let preview = if image.data.len() > 50 {
            format!("{}...[{} chars total]", image.data.chars().take(50).collect::<String>(), image.data.len())
        } else {
            image.data.clone()
        };
        info!("🖼️ Extracted {} image from API response: {}", image.mime_type, preview);
        Ok(image)
    }
}

/// Parses the model's text as JSON, tolerating a surrounding markdown code fence.
fn parse_json_output(text: &str) -> Result<Value, GeminiError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced.trim())
        .map_err(|e| GeminiError::MalformedOutput(format!("response is not JSON: {}", e)))
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData
    },
    Text { text: String },
    #[allow(dead_code)]
    Other(Value)
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

fn extract_text(resp: &GeminiResponse) -> Option<String> {
    let candidate = resp.candidates.first()?;
    let text: String = candidate
        .content
        .parts
        .iter()
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    if text.trim().is_empty() { None } else { Some(text) }
}

fn extract_first_image(resp: &GeminiResponse) -> Option<InlineImage> {
    for c in &resp.candidates {
        for p in &c.content.parts {
            if let Part::Inline { inline_data } = p {
                return Some(InlineImage {
                    mime_type: inline_data.mime_type.clone(),
                    data: inline_data.data.clone(),
                });
            }
        }
    }
    info!("⚠️ No inline image data found in response structure");
    None
}
