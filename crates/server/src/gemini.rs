use crate::backend::{GenerateOptions, ModelBackend, ModelError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const API_KEY_ENV: &str = "GCP_AI_API_KEY";

/// Gemini `generateContent` over REST
pub struct GeminiBackend {
    client: reqwest::Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: model.into(),
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Point at another endpoint (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn build_request<'a>(parts: &'a [String], options: &GenerateOptions) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: parts.iter().map(|text| TextPart { text }).collect(),
        }],
        generation_config: GenerationConfig {
            temperature: options.temperature,
            response_mime_type: options.json_mode.then_some("application/json"),
        },
    }
}

fn response_text(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.text)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, parts: &[String], options: &GenerateOptions) -> Result<String, ModelError> {
        let body = build_request(parts, options);
        log::debug!("Calling {} for {} stage", self.model, options.stage);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        response_text(parsed).ok_or(ModelError::EmptyResponse)
    }
}

/// Key lookup order: explicit value, `GCP_AI_API_KEY`, `~/.secrets/GCP_AI_API_KEY`
pub fn resolve_api_key(explicit: Option<&str>) -> Result<String, ModelError> {
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        let key = key.trim();
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }
    if let Some(path) = secrets_file() {
        if let Ok(key) = std::fs::read_to_string(&path) {
            let key = key.trim();
            if !key.is_empty() {
                log::debug!("Using API key from {}", path.display());
                return Ok(key.to_string());
            }
        }
    }
    Err(ModelError::MissingApiKey)
}

fn secrets_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".secrets").join(API_KEY_ENV))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctx_protocol::Stage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_body() {
        let parts = vec!["{\"snapshot\":{}}".to_string(), "Acknowledge".to_string()];
        let options = GenerateOptions::for_stage(Stage::Load, 0.8);
        let value = serde_json::to_value(build_request(&parts, &options)).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [{"text": "{\"snapshot\":{}}"}, {"text": "Acknowledge"}]
                }],
                "generationConfig": {
                    "temperature": 0.8,
                    "responseMimeType": "application/json"
                }
            })
        );
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]
        }))
        .unwrap();
        assert_eq!(response_text(response).as_deref(), Some("{\"a\":1}"));

        let empty: GenerateResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert_eq!(response_text(empty), None);
    }

    #[test]
    fn test_explicit_key_wins() {
        assert_eq!(resolve_api_key(Some("  abc  ")).unwrap(), "abc");
    }

    #[test]
    fn test_endpoint() {
        let backend = GeminiBackend::new("gemini-test", "k").with_base_url("http://localhost:9/models/");
        assert_eq!(
            backend.endpoint(),
            "http://localhost:9/models/gemini-test:generateContent"
        );
    }
}
