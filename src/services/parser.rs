use crate::errors::NutritionError;
use crate::models::NutritionResult;

/// Strips a ```json fence some models wrap around structured output.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Turns the model's structured reply into the canonical result.
pub fn parse_nutrition_result(text: &str) -> Result<NutritionResult, NutritionError> {
    let payload = strip_code_fence(text);
    if payload.is_empty() || payload == "null" || payload == "{}" {
        return Err(NutritionError::NutritionAnalysis(
            "No nutrition data received from analysis service".to_string(),
        ));
    }

    let result: NutritionResult = serde_json::from_str(payload).map_err(|e| {
        NutritionError::NutritionAnalysis(format!(
            "Failed to parse nutrition analysis results: {}",
            e
        ))
    })?;

    result.check_bounds().map_err(|e| {
        NutritionError::NutritionAnalysis(format!(
            "Failed to parse nutrition analysis results: {}",
            e
        ))
    })?;

    Ok(result)
}
