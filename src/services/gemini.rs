use base64::{engine::general_purpose, Engine};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::model::{GenerateRequest, GenerativeModel, ModelError, ModelOutput, UsageMetadata};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request(request: GenerateRequest) -> GeminiRequest {
        let mut parts = vec![Part::Text {
            text: request.prompt,
        }];
        if let Some(image) = request.image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.to_string(),
                    data: general_purpose::STANDARD.encode(&image.data),
                },
            });
        }

        let generation_config = if request.temperature.is_some() || request.response_schema.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                response_mime_type: request
                    .response_schema
                    .as_ref()
                    .map(|_| "application/json"),
                response_schema: request.response_schema,
            })
        } else {
            None
        };

        GeminiRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config,
        }
    }
}

/// Maps a failed HTTP exchange to a model error kind.
fn classify_failure(status: StatusCode, body: &str) -> ModelError {
    let (message, google_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.to_string(), String::new()),
    };
    let detail = format!("HTTP {}: {}", status.as_u16(), message);

    if status == StatusCode::TOO_MANY_REQUESTS || google_status == "RESOURCE_EXHAUSTED" {
        return ModelError::RateLimited(detail);
    }
    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || google_status == "UNAUTHENTICATED"
        || google_status == "PERMISSION_DENIED"
        || (status == StatusCode::BAD_REQUEST && message.to_lowercase().contains("api key"))
    {
        return ModelError::Authentication(detail);
    }
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::GATEWAY_TIMEOUT
        || google_status == "DEADLINE_EXCEEDED"
    {
        return ModelError::Timeout(detail);
    }
    ModelError::Service(detail)
}

/// Token counters are read leniently: a counter that is not a non-negative
/// integer within `u32` is treated as absent.
fn usage_from_value(value: &Value) -> UsageMetadata {
    let count = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };

    UsageMetadata {
        prompt_token_count: count("promptTokenCount"),
        candidates_token_count: count("candidatesTokenCount"),
        total_token_count: count("totalTokenCount"),
    }
}

fn transport_failure(e: reqwest::Error) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout(e.to_string())
    } else {
        ModelError::Service(e.to_string())
    }
}

#[async_trait::async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<ModelOutput, ModelError> {
        let api_key = self.api_key.as_deref().ok_or(ModelError::MissingApiKey)?;
        let has_image = request.image.is_some();
        let body = Self::build_request(request);

        log::info!(
            "🤖 Sending request to Gemini with model: {} (image: {})",
            self.model,
            has_image
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        let response_text = response.text().await.map_err(transport_failure)?;
        if !status.is_success() {
            log::error!("❌ Gemini API error ({}): {}", status, response_text);
            return Err(classify_failure(status, &response_text));
        }

        log::debug!("📄 Raw Gemini response size: {} bytes", response_text.len());
        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| ModelError::Service(format!("malformed response: {}", e)))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let usage = parsed.usage_metadata.as_ref().map(usage_from_value);

        Ok(ModelOutput { text, usage })
    }
}
