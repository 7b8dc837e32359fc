use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Upper bound of `confidenceScore`.
pub const MAX_CONFIDENCE_SCORE: u8 = 10;
/// Upper bound of every health score.
pub const MAX_HEALTH_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Portion {
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "piece")]
    Piece,
    #[serde(rename = "slice")]
    Slice,
    #[serde(rename = "cup")]
    Cup,
    #[serde(rename = "bowl")]
    Bowl,
    #[serde(rename = "plate")]
    Plate,
    #[serde(rename = "serving")]
    Serving,
}

impl Portion {
    pub const ALL: [Portion; 8] = [
        Portion::Gram,
        Portion::Milliliter,
        Portion::Piece,
        Portion::Slice,
        Portion::Cup,
        Portion::Bowl,
        Portion::Plate,
        Portion::Serving,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Portion::Gram => "g",
            Portion::Milliliter => "ml",
            Portion::Piece => "piece",
            Portion::Slice => "slice",
            Portion::Cup => "cup",
            Portion::Bowl => "bowl",
            Portion::Plate => "plate",
            Portion::Serving => "serving",
        }
    }
}

impl std::fmt::Display for Portion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One component of an analysed meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionIngredient {
    pub name: String,
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
    pub fiber: u32,
    pub health_score: u8,
    pub health_comments: String,
}

/// Canonical nutrition estimate. Every analysis path (image, description,
/// barcode) ends up producing this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionResult {
    pub food_name: String,
    pub portion: Portion,
    pub portion_size: f64,
    pub confidence_score: u8,
    pub ingredients: Vec<NutritionIngredient>,
    #[serde(default)]
    pub primary_concerns: Vec<String>,
    #[serde(default)]
    pub suggest_alternatives: Vec<String>,
    pub overall_health_score: u8,
    pub overall_health_comments: String,
}

impl NutritionResult {
    pub fn total_calories(&self) -> u32 {
        self.ingredients.iter().map(|i| i.calories).sum()
    }

    /// Checks the bounded scales the schema cannot express.
    pub fn check_bounds(&self) -> Result<(), String> {
        if self.confidence_score > MAX_CONFIDENCE_SCORE {
            return Err(format!(
                "confidenceScore {} exceeds {}",
                self.confidence_score, MAX_CONFIDENCE_SCORE
            ));
        }
        if self.overall_health_score > MAX_HEALTH_SCORE {
            return Err(format!(
                "overallHealthScore {} exceeds {}",
                self.overall_health_score, MAX_HEALTH_SCORE
            ));
        }
        if let Some(bad) = self
            .ingredients
            .iter()
            .find(|i| i.health_score > MAX_HEALTH_SCORE)
        {
            return Err(format!(
                "healthScore {} of '{}' exceeds {}",
                bad.health_score, bad.name, MAX_HEALTH_SCORE
            ));
        }
        if !self.portion_size.is_finite() || self.portion_size < 0.0 {
            return Err(format!("invalid portionSize {}", self.portion_size));
        }
        Ok(())
    }

    /// Response schema handed to the model so its output decodes straight
    /// into this type.
    pub fn response_schema() -> Value {
        let portions: Vec<&str> = Portion::ALL.iter().map(Portion::as_str).collect();

        json!({
            "type": "OBJECT",
            "properties": {
                "foodName": { "type": "STRING" },
                "portion": { "type": "STRING", "enum": portions },
                "portionSize": { "type": "NUMBER" },
                "confidenceScore": { "type": "INTEGER", "minimum": 0, "maximum": MAX_CONFIDENCE_SCORE },
                "ingredients": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "name": { "type": "STRING" },
                            "calories": { "type": "INTEGER", "minimum": 0 },
                            "protein": { "type": "INTEGER", "minimum": 0 },
                            "carbs": { "type": "INTEGER", "minimum": 0 },
                            "fat": { "type": "INTEGER", "minimum": 0 },
                            "fiber": { "type": "INTEGER", "minimum": 0 },
                            "healthScore": { "type": "INTEGER", "minimum": 0, "maximum": MAX_HEALTH_SCORE },
                            "healthComments": { "type": "STRING" }
                        },
                        "required": ["name", "calories", "protein", "carbs", "fat", "fiber", "healthScore", "healthComments"],
                        "propertyOrdering": ["name", "calories", "protein", "carbs", "fat", "fiber", "healthScore", "healthComments"]
                    }
                },
                "primaryConcerns": { "type": "ARRAY", "items": { "type": "STRING" } },
                "suggestAlternatives": { "type": "ARRAY", "items": { "type": "STRING" } },
                "overallHealthScore": { "type": "INTEGER", "minimum": 0, "maximum": MAX_HEALTH_SCORE },
                "overallHealthComments": { "type": "STRING" }
            },
            "required": [
                "foodName", "portion", "portionSize", "confidenceScore", "ingredients",
                "primaryConcerns", "suggestAlternatives", "overallHealthScore", "overallHealthComments"
            ],
            "propertyOrdering": [
                "foodName", "portion", "portionSize", "confidenceScore", "ingredients",
                "primaryConcerns", "suggestAlternatives", "overallHealthScore", "overallHealthComments"
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NutritionResult {
        NutritionResult {
            food_name: "Chicken Caesar Salad".to_string(),
            portion: Portion::Bowl,
            portion_size: 1.0,
            confidence_score: 8,
            ingredients: vec![
                NutritionIngredient {
                    name: "Chicken".to_string(),
                    calories: 220,
                    protein: 30,
                    carbs: 0,
                    fat: 9,
                    fiber: 0,
                    health_score: 85,
                    health_comments: "Lean protein".to_string(),
                },
                NutritionIngredient {
                    name: "Croutons".to_string(),
                    calories: 120,
                    protein: 3,
                    carbs: 20,
                    fat: 4,
                    fiber: 1,
                    health_score: 40,
                    health_comments: "Refined carbs".to_string(),
                },
            ],
            primary_concerns: vec!["sodium".to_string()],
            suggest_alternatives: vec!["Skip the croutons".to_string()],
            overall_health_score: 70,
            overall_health_comments: "Balanced".to_string(),
        }
    }

    #[test]
    fn test_camel_case_wire_names() {
        let value = serde_json::to_value(sample()).unwrap();

        assert_eq!(value["foodName"], "Chicken Caesar Salad");
        assert_eq!(value["portion"], "bowl");
        assert_eq!(value["confidenceScore"], 8);
        assert_eq!(value["ingredients"][0]["healthScore"], 85);
        assert_eq!(value["suggestAlternatives"][0], "Skip the croutons");
    }

    #[test]
    fn test_negative_calories_rejected() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["ingredients"][0]["calories"] = json!(-5);

        assert!(serde_json::from_value::<NutritionResult>(value).is_err());
    }

    #[test]
    fn test_check_bounds() {
        assert!(sample().check_bounds().is_ok());

        let mut result = sample();
        result.confidence_score = 11;
        assert!(result.check_bounds().is_err());

        let mut result = sample();
        result.ingredients[1].health_score = 101;
        let err = result.check_bounds().unwrap_err();
        assert!(err.contains("Croutons"));
    }

    #[test]
    fn test_total_calories() {
        assert_eq!(sample().total_calories(), 340);
    }

    #[test]
    fn test_schema_lists_every_portion() {
        let schema = NutritionResult::response_schema();
        let portions = schema["properties"]["portion"]["enum"].as_array().unwrap();

        assert_eq!(portions.len(), Portion::ALL.len());
        assert!(portions.contains(&json!("g")));
        assert_eq!(schema["required"].as_array().unwrap().len(), 9);
    }
}
