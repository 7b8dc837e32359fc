use anyhow::{bail, Result};

/// User context that shapes an analysis prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub description: Option<&'a str>,
    pub goals: &'a [String],
    pub diet: &'a [String],
    pub allergies: &'a [String],
}

/// Builds the text prompt for a nutrition analysis.
pub trait PromptBuilder: Send + Sync {
    fn build_image_prompt(&self, context: &PromptContext<'_>, image_ref: Option<&str>) -> Result<String>;
    fn build_description_prompt(&self, context: &PromptContext<'_>) -> Result<String>;
}

pub fn join_or_none(items: &[String]) -> String {
    let cleaned: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if cleaned.is_empty() {
        "none".to_string()
    } else {
        cleaned.join(", ")
    }
}

const OUTPUT_RULES: &str = "\
Rules:
- Break the meal into its main ingredients and estimate calories, protein, carbs, fat and fiber (grams) for each, as whole numbers.
- Give each ingredient a health score from 0 to 100 with a short comment.
- Choose the portion unit that fits best and estimate the portion size.
- Rate your confidence from 0 (guessing) to 10 (certain).
- List the primary health concerns for this user and suggest healthier alternatives that respect their diet and allergies.
- Never suggest anything containing the user's allergens.
- Finish with an overall health score from 0 to 100 and a short overall comment.";

/// Default prompt templates for the nutrition analysis.
#[derive(Debug, Default, Clone, Copy)]
pub struct NutritionPromptBuilder;

impl NutritionPromptBuilder {
    fn user_section(context: &PromptContext<'_>) -> String {
        format!(
            "User profile:\n- Health goals: {}\n- Dietary preferences: {}\n- Allergies: {}\n",
            join_or_none(context.goals),
            join_or_none(context.diet),
            join_or_none(context.allergies),
        )
    }
}

impl PromptBuilder for NutritionPromptBuilder {
    fn build_image_prompt(&self, context: &PromptContext<'_>, image_ref: Option<&str>) -> Result<String> {
        let mut prompt = String::from(match image_ref {
            Some(_) => "You are a nutrition analysis expert. Identify the food in the attached photo and estimate its nutritional content.\n\n",
            None => "You are a nutrition analysis expert. No photo is available; estimate the nutritional content from the description alone.\n\n",
        });
        prompt.push_str(&Self::user_section(context));

        if let Some(description) = context.description {
            prompt.push_str(&format!("\nThe user describes the meal as: \"{}\"\n", description));
        }
        prompt.push('\n');
        prompt.push_str(OUTPUT_RULES);
        Ok(prompt)
    }

    fn build_description_prompt(&self, context: &PromptContext<'_>) -> Result<String> {
        let Some(description) = context.description else {
            bail!("a food description is required");
        };

        let mut prompt = String::from(
            "You are a nutrition analysis expert. Estimate the nutritional content of the meal the user describes.\n\n",
        );
        prompt.push_str(&Self::user_section(context));
        prompt.push_str(&format!("\nMeal description: \"{}\"\n\n", description));
        prompt.push_str(OUTPUT_RULES);
        Ok(prompt)
    }
}
