use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::time::Duration;

use super::NutritionResult;

/// Token accounting for a single model call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TokenUsage {
    pub input_token_count: u32,
    pub output_token_count: u32,
    pub total_token_count: u32,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ServiceMetadata {
    pub execution_time_seconds: f64,
    /// Absent when no structured model call was accounted for.
    #[serde(flatten)]
    pub usage: Option<TokenUsage>,
}

impl ServiceMetadata {
    pub fn new(elapsed: Duration, usage: Option<TokenUsage>) -> Self {
        Self {
            execution_time_seconds: round_to(elapsed.as_secs_f64(), 4),
            usage,
        }
    }

    pub fn timing_only(elapsed: Duration) -> Self {
        Self::new(elapsed, None)
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Outcome of one dispatcher call: exactly one of success or failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceResponse {
    Success {
        result: NutritionResult,
        message: String,
        metadata: ServiceMetadata,
    },
    Failure {
        status: u16,
        message: String,
        metadata: ServiceMetadata,
    },
}

impl ServiceResponse {
    pub fn status(&self) -> u16 {
        match self {
            ServiceResponse::Success { .. } => 200,
            ServiceResponse::Failure { status, .. } => *status,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ServiceResponse::Success { message, .. } | ServiceResponse::Failure { message, .. } => {
                message
            }
        }
    }

    pub fn metadata(&self) -> &ServiceMetadata {
        match self {
            ServiceResponse::Success { metadata, .. }
            | ServiceResponse::Failure { metadata, .. } => metadata,
        }
    }

    pub fn result(&self) -> Option<&NutritionResult> {
        match self {
            ServiceResponse::Success { result, .. } => Some(result),
            ServiceResponse::Failure { .. } => None,
        }
    }
}

/// `{response, status, message, metadata}` where `response` is the
/// nutrition result on success and an empty string on failure.
impl Serialize for ServiceResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ServiceResponse", 4)?;
        match self.result() {
            Some(result) => state.serialize_field("response", result)?,
            None => state.serialize_field("response", "")?,
        }
        state.serialize_field("status", &self.status())?;
        state.serialize_field("message", self.message())?;
        state.serialize_field("metadata", self.metadata())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NutritionIngredient, Portion};

    fn result() -> NutritionResult {
        NutritionResult {
            food_name: "Apple".to_string(),
            portion: Portion::Piece,
            portion_size: 1.0,
            confidence_score: 9,
            ingredients: vec![NutritionIngredient {
                name: "Apple".to_string(),
                calories: 95,
                protein: 0,
                carbs: 25,
                fat: 0,
                fiber: 4,
                health_score: 95,
                health_comments: "Whole fruit".to_string(),
            }],
            primary_concerns: vec![],
            suggest_alternatives: vec![],
            overall_health_score: 95,
            overall_health_comments: "Great snack".to_string(),
        }
    }

    #[test]
    fn test_success_payload_shape() {
        let response = ServiceResponse::Success {
            result: result(),
            message: "SUCCESS".to_string(),
            metadata: ServiceMetadata::new(
                Duration::from_millis(1234),
                Some(TokenUsage {
                    input_token_count: 100,
                    output_token_count: 50,
                    total_token_count: 150,
                    estimated_cost: 0.00003,
                }),
            ),
        };

        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["status"], 200);
        assert_eq!(value["message"], "SUCCESS");
        assert_eq!(value["response"]["foodName"], "Apple");
        assert_eq!(value["metadata"]["execution_time_seconds"], 1.234);
        assert_eq!(value["metadata"]["input_token_count"], 100);
        assert_eq!(value["metadata"]["total_token_count"], 150);
    }

    #[test]
    fn test_failure_payload_has_empty_response_and_timing() {
        let response = ServiceResponse::Failure {
            status: 500,
            message: "Internal server error: boom".to_string(),
            metadata: ServiceMetadata::timing_only(Duration::from_micros(123_456)),
        };

        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["response"], "");
        assert_eq!(value["status"], 500);
        assert_eq!(value["metadata"]["execution_time_seconds"], 0.1235);
        assert!(value["metadata"].get("input_token_count").is_none());
        assert!(response.result().is_none());
    }
}
