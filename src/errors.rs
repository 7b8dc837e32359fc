use serde::Serialize;
use thiserror::Error;

/// Why an upstream service call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalFailure {
    RateLimited,
    Timeout,
    Unavailable,
}

/// Seconds a client should wait after a rate limit.
pub const RATE_LIMIT_RETRY_AFTER_SECS: u64 = 60;

/// Typed failures of a nutrition analysis. Each kind maps to one client
/// facing error payload.
#[derive(Debug, Error)]
pub enum NutritionError {
    #[error("{message}")]
    Validation {
        message: String,
        field: String,
        suggestion: Option<String>,
    },

    #[error("{0}")]
    ImageProcessing(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{message}")]
    ExternalService {
        kind: ExternalFailure,
        service: &'static str,
        message: String,
    },

    #[error("{0}")]
    NutritionAnalysis(String),

    #[error("{0}")]
    BusinessLogic(String),
}

impl NutritionError {
    pub fn validation(message: impl Into<String>, field: &str, suggestion: Option<&str>) -> Self {
        NutritionError::Validation {
            message: message.into(),
            field: field.to_string(),
            suggestion: suggestion.map(str::to_string),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            NutritionError::Validation { .. } => 400,
            NutritionError::ImageProcessing(_) => 422,
            NutritionError::ExternalService { kind, .. } => match kind {
                ExternalFailure::RateLimited => 429,
                ExternalFailure::Timeout => 504,
                ExternalFailure::Unavailable => 502,
            },
            NutritionError::Configuration(_)
            | NutritionError::NutritionAnalysis(_)
            | NutritionError::BusinessLogic(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            NutritionError::Validation { .. } => "VALIDATION_ERROR",
            NutritionError::ImageProcessing(_) => "IMAGE_PROCESSING_ERROR",
            NutritionError::Configuration(_) => "CONFIGURATION_ERROR",
            NutritionError::ExternalService { kind, .. } => match kind {
                ExternalFailure::RateLimited => "API_RATE_LIMIT_EXCEEDED",
                ExternalFailure::Timeout => "EXTERNAL_SERVICE_TIMEOUT",
                ExternalFailure::Unavailable => "EXTERNAL_SERVICE_ERROR",
            },
            NutritionError::NutritionAnalysis(_) => "NUTRITION_ANALYSIS_ERROR",
            NutritionError::BusinessLogic(_) => "BUSINESS_LOGIC_ERROR",
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            NutritionError::ExternalService {
                kind: ExternalFailure::RateLimited,
                ..
            } => Some(RATE_LIMIT_RETRY_AFTER_SECS),
            _ => None,
        }
    }

    /// Transient upstream faults a caller may retry. Configuration problems never are.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NutritionError::ExternalService {
                kind: ExternalFailure::RateLimited | ExternalFailure::Timeout,
                ..
            }
        )
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            NutritionError::Validation { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            NutritionError::Validation { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    pub fn service(&self) -> Option<&'static str> {
        match self {
            NutritionError::ExternalService { service, .. } => Some(*service),
            _ => None,
        }
    }
}

/// Body of a client facing error.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    pub retryable: bool,
}

impl NutritionError {
    pub fn to_body(&self) -> ErrorBody<'_> {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
            field: self.field(),
            suggestion: self.suggestion(),
            service: self.service(),
            retry_after: self.retry_after(),
            retryable: self.is_retryable(),
        }
    }
}
