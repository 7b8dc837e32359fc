use serde_json::Value;
use thiserror::Error;

use super::image::ImageBytes;
use crate::errors::{ExternalFailure, NutritionError};
use crate::models::NutritionResult;

/// Name used for the model in client facing errors.
pub const MODEL_SERVICE_NAME: &str = "Gemini AI";

/// Reply the model gives when no barcode is visible.
pub const NO_BARCODE_SENTINEL: &str = "NO_BARCODE";

pub const BARCODE_INSTRUCTION: &str = "Extract the barcode number from this image. \
Look for any numeric barcode (UPC, EAN, etc.). Return ONLY the numeric barcode value, nothing else. \
If you cannot find a barcode, respond with 'NO_BARCODE'.";

/// One call to a generative model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub image: Option<ImageBytes>,
    pub temperature: Option<f32>,
    /// When set the model must answer with JSON matching this schema.
    pub response_schema: Option<Value>,
}

/// Token counters as reported by the model. Any of them may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
    pub total_token_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelOutput {
    pub text: String,
    pub usage: Option<UsageMetadata>,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("GOOGLE_API_KEY is not set")]
    MissingApiKey,

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("service error: {0}")]
    Service(String),
}

impl From<ModelError> for NutritionError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::MissingApiKey => NutritionError::Configuration(
                "Environment variable GOOGLE_API_KEY is not set".to_string(),
            ),
            ModelError::Authentication(_) => NutritionError::Configuration(format!(
                "Invalid API key for {}. Check the service configuration.",
                MODEL_SERVICE_NAME
            )),
            ModelError::RateLimited(_) => NutritionError::ExternalService {
                kind: ExternalFailure::RateLimited,
                service: MODEL_SERVICE_NAME,
                message: "API rate limit exceeded. Please try again later.".to_string(),
            },
            ModelError::Timeout(_) => NutritionError::ExternalService {
                kind: ExternalFailure::Timeout,
                service: MODEL_SERVICE_NAME,
                message: format!(
                    "Request to {} timed out. Please try again.",
                    MODEL_SERVICE_NAME
                ),
            },
            ModelError::Service(detail) => NutritionError::ExternalService {
                kind: ExternalFailure::Unavailable,
                service: MODEL_SERVICE_NAME,
                message: format!("{} service error: {}", MODEL_SERVICE_NAME, detail),
            },
        }
    }
}

/// A multimodal model that turns a prompt (and optionally an image) into text.
#[async_trait::async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<ModelOutput, ModelError>;
}

/// What the model read off a barcode photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarcodeReading {
    NotVisible,
    Text(String),
}

/// Asks the model to read the barcode digits in `image`.
pub async fn read_barcode(
    model: &dyn GenerativeModel,
    image: ImageBytes,
) -> Result<BarcodeReading, ModelError> {
    let output = model
        .generate(GenerateRequest {
            prompt: BARCODE_INSTRUCTION.to_string(),
            image: Some(image),
            temperature: None,
            response_schema: None,
        })
        .await?;

    let text = output.text.trim();
    if text == NO_BARCODE_SENTINEL {
        Ok(BarcodeReading::NotVisible)
    } else {
        Ok(BarcodeReading::Text(text.to_string()))
    }
}

/// Structured nutrition analysis with deterministic decoding.
pub async fn analyze_nutrition(
    model: &dyn GenerativeModel,
    prompt: String,
    image: Option<ImageBytes>,
) -> Result<ModelOutput, ModelError> {
    model
        .generate(GenerateRequest {
            prompt,
            image,
            temperature: Some(0.0),
            response_schema: Some(NutritionResult::response_schema()),
        })
        .await
}
