use serde::{Deserialize, Serialize};

use crate::errors::NutritionError;

/// Longest food description accepted for analysis.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Which analysis path a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    #[serde(alias = "food")]
    Image,
    Description,
    Barcode,
}

/// Where the request's image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource<'a> {
    /// Base64 payload, optionally wrapped in a data URL.
    Inline(&'a str),
    /// Upload reference or remote URL.
    Reference(&'a str),
}

/// Incoming analysis request, in the wire shape the mobile client sends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, rename = "food_description")]
    pub food_description: Option<String>,
    #[serde(default)]
    pub dietary_preferences: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub selected_goals: Vec<String>,
    #[serde(default)]
    pub scan_mode: ScanMode,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AnalysisRequest {
    pub fn description(&self) -> Option<&str> {
        non_blank(&self.food_description)
    }

    /// The image the request carries, if any. `validate` guarantees at most one.
    pub fn image(&self) -> Option<ImageSource<'_>> {
        non_blank(&self.image_data)
            .map(ImageSource::Inline)
            .or_else(|| non_blank(&self.image_url).map(ImageSource::Reference))
    }

    pub fn validate(&self) -> Result<(), NutritionError> {
        if non_blank(&self.image_data).is_some() && non_blank(&self.image_url).is_some() {
            return Err(NutritionError::validation(
                "Provide either imageData or imageUrl, not both.",
                "image",
                Some("Send the photo once, either inline or as an uploaded URL."),
            ));
        }

        if let Some(description) = self.description() {
            if description.chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(NutritionError::validation(
                    format!(
                        "Food description is too long (maximum {} characters).",
                        MAX_DESCRIPTION_CHARS
                    ),
                    "food_description",
                    Some("Shorten the description to the main foods and portions."),
                ));
            }
        }

        match self.scan_mode {
            ScanMode::Barcode if self.image().is_none() => Err(NutritionError::validation(
                "Barcode scanning requires an image.",
                "imageUrl",
                Some("Take a photo of the barcode and try again."),
            )),
            ScanMode::Description if self.description().is_none() => {
                Err(NutritionError::validation(
                    "A food description is required.",
                    "food_description",
                    Some("Describe what you ate, e.g. 'two slices of pepperoni pizza'."),
                ))
            }
            ScanMode::Image if self.image().is_none() && self.description().is_none() => {
                Err(NutritionError::validation(
                    "Either an image or a food description is required.",
                    "imageUrl",
                    Some("Attach a photo of your meal or describe it."),
                ))
            }
            _ => Ok(()),
        }
    }
}
