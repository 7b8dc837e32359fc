use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::NutritionError;
use crate::models::{
    AnalysisRequest, ImageSource, NutritionResult, ScanMode, ServiceMetadata, ServiceResponse,
};
use crate::services::accounting::account_usage;
use crate::services::barcode::extract_barcode_from_text;
use crate::services::model::{analyze_nutrition, read_barcode, BarcodeReading, GenerativeModel};
use crate::services::parser::parse_nutrition_result;
use crate::services::prompt::{PromptBuilder, PromptContext};
use crate::services::{ImageFetcher, ProductLookup};

/// Entry point of a nutrition analysis. Picks the barcode or the model
/// analysis path and runs it to a single response.
pub struct NutritionHandler {
    model: Arc<dyn GenerativeModel>,
    products: Arc<dyn ProductLookup>,
    prompts: Arc<dyn PromptBuilder>,
    images: ImageFetcher,
}

impl NutritionHandler {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        products: Arc<dyn ProductLookup>,
        prompts: Arc<dyn PromptBuilder>,
        images: ImageFetcher,
    ) -> Self {
        Self {
            model,
            products,
            prompts,
            images,
        }
    }

    /// Typed errors come back as `Err` for the client facing boundary;
    /// anything else becomes a 500 failure envelope.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<ServiceResponse, NutritionError> {
        let start = Instant::now();
        log::info!("📨 Nutrition request received (mode: {:?})", request.scan_mode);

        let outcome = match request.scan_mode {
            ScanMode::Barcode => self.barcode_flow(request, start).await,
            ScanMode::Image | ScanMode::Description => self.analysis_flow(request, start).await,
        };

        match outcome {
            Ok(response) => {
                log::info!(
                    "✅ Nutrition request finished in {:.3}s",
                    response.metadata().execution_time_seconds
                );
                Ok(response)
            }
            Err(err) => match err.downcast::<NutritionError>() {
                Ok(domain) => {
                    log::warn!("⚠️ Nutrition request failed ({}): {}", domain.code(), domain);
                    Err(domain)
                }
                Err(other) => {
                    log::error!("❌ Internal error during nutrition analysis: {:#}", other);
                    Ok(ServiceResponse::Failure {
                        status: 500,
                        message: format!("Internal server error: {}", other),
                        metadata: ServiceMetadata::timing_only(start.elapsed()),
                    })
                }
            },
        }
    }

    async fn barcode_flow(&self, request: &AnalysisRequest, start: Instant) -> Result<ServiceResponse> {
        request.validate()?;
        let source = request.image().ok_or_else(|| {
            NutritionError::validation("Barcode scanning requires an image.", "imageUrl", None)
        })?;

        let image = self.images.acquire(source).await?;
        let barcode_text = match read_barcode(self.model.as_ref(), image)
            .await
            .map_err(NutritionError::from)?
        {
            BarcodeReading::NotVisible => {
                return Err(NutritionError::validation(
                    "Could not detect barcode in image. Please ensure the barcode is clearly visible and try again.",
                    "barcode",
                    Some("Make sure the barcode is in focus and well-lit."),
                )
                .into())
            }
            BarcodeReading::Text(text) => text,
        };

        let barcode = extract_barcode_from_text(&barcode_text).ok_or_else(|| {
            NutritionError::validation(
                format!(
                    "Could not parse barcode from detected text: {}. Please try again.",
                    barcode_text
                ),
                "barcode",
                Some("Ensure the barcode is clearly visible in the image."),
            )
        })?;
        log::info!("🔍 Detected barcode: {}", barcode);

        let product = self.products.lookup(&barcode).await?.ok_or_else(|| {
            NutritionError::validation(
                format!(
                    "Product with barcode {} not found in the Open Food Facts database.",
                    barcode
                ),
                "barcode",
                Some("Try scanning a different product or use regular food scanning."),
            )
        })?;
        log::info!("✅ Product found: {}", product.product_name);

        Ok(ServiceResponse::Success {
            result: product.to_nutrition_result(),
            message: format!("SUCCESS - Product found: {}", product.product_name),
            metadata: ServiceMetadata::timing_only(start.elapsed()),
        })
    }

    async fn analysis_flow(&self, request: &AnalysisRequest, start: Instant) -> Result<ServiceResponse> {
        request.validate()?;

        let context = PromptContext {
            description: request.description(),
            goals: &request.selected_goals,
            diet: &request.dietary_preferences,
            allergies: &request.allergies,
        };
        let source = match request.scan_mode {
            ScanMode::Description => None,
            _ => request.image(),
        };

        let prompt = match source {
            Some(source) => {
                let image_ref = match source {
                    ImageSource::Reference(reference) => Some(reference),
                    ImageSource::Inline(_) => Some("inline image"),
                };
                self.prompts.build_image_prompt(&context, image_ref)
            }
            None => self.prompts.build_description_prompt(&context),
        }
        .map_err(|e| {
            NutritionError::BusinessLogic(format!("Failed to generate analysis prompt: {}", e))
        })?;

        let image = match source {
            Some(source) => Some(self.images.acquire(source).await?),
            None => None,
        };

        let output = analyze_nutrition(self.model.as_ref(), prompt, image)
            .await
            .map_err(NutritionError::from)?;

        let usage = account_usage(output.usage.as_ref());
        let result: NutritionResult = parse_nutrition_result(&output.text)?;
        log::info!(
            "🍽️ Analysis result: {} (~{} kcal, confidence {})",
            result.food_name,
            result.total_calories(),
            result.confidence_score
        );

        Ok(ServiceResponse::Success {
            result,
            message: "SUCCESS".to_string(),
            metadata: ServiceMetadata::new(start.elapsed(), Some(usage)),
        })
    }
}
