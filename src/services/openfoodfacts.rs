use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::models::{NutritionIngredient, NutritionResult, Portion, MAX_CONFIDENCE_SCORE};

pub const PRODUCT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Health score given to every packaged product. Placeholder: it does not
/// look at the nutrient profile.
pub const PACKAGED_PRODUCT_HEALTH_SCORE: u8 = 75;

/// Packaged-goods product, normalized from the database response.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub product_name: String,
    pub brands: String,
    pub quantity: String,
    pub image_url: String,
    /// Per-100g/100ml values keyed by Open Food Facts nutrient names.
    pub nutriments: Map<String, Value>,
    pub serving_size: String,
}

impl ProductRecord {
    /// Numeric nutrient value, accepting numbers and numeric strings.
    pub fn nutrient(&self, key: &str) -> f64 {
        match self.nutriments.get(key) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    fn whole_nutrient(&self, key: &str) -> u32 {
        let value = self.nutrient(key);
        if value.is_finite() && value > 0.0 {
            value.trunc() as u32
        } else {
            0
        }
    }

    fn brand_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.brands.trim().is_empty() {
            fallback
        } else {
            &self.brands
        }
    }

    /// Translates the record into the canonical result. Values are per
    /// 100g/100ml and confidence is maximal since the lookup is exact.
    pub fn to_nutrition_result(&self) -> NutritionResult {
        let ingredient = NutritionIngredient {
            name: self.product_name.clone(),
            calories: self.whole_nutrient("energy-kcal_100g"),
            protein: self.whole_nutrient("proteins_100g"),
            carbs: self.whole_nutrient("carbohydrates_100g"),
            fat: self.whole_nutrient("fat_100g"),
            fiber: self.whole_nutrient("fiber_100g"),
            health_score: PACKAGED_PRODUCT_HEALTH_SCORE,
            health_comments: format!("Packaged product: {}", self.brand_or("Unknown brand")),
        };

        NutritionResult {
            food_name: self.product_name.clone(),
            portion: Portion::Gram,
            portion_size: 100.0,
            confidence_score: MAX_CONFIDENCE_SCORE,
            ingredients: vec![ingredient],
            primary_concerns: Vec::new(),
            suggest_alternatives: Vec::new(),
            overall_health_score: PACKAGED_PRODUCT_HEALTH_SCORE,
            overall_health_comments: format!(
                "Scanned product from barcode database. Brand: {}. Nutritional values are per 100g/100ml.",
                self.brand_or("Unknown")
            ),
        }
    }
}

/// Lookup of packaged products by barcode. `Ok(None)` means no match.
#[async_trait::async_trait]
pub trait ProductLookup: Send + Sync {
    async fn lookup(&self, barcode: &str) -> Result<Option<ProductRecord>>;
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    product: Option<OffProduct>,
}

#[derive(Debug, Deserialize)]
struct OffProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brands: Option<String>,
    #[serde(default)]
    quantity: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    nutriments: Option<Map<String, Value>>,
    #[serde(default)]
    serving_size: Option<String>,
}

impl From<OffProduct> for ProductRecord {
    fn from(product: OffProduct) -> Self {
        Self {
            product_name: product
                .product_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Unknown Product".to_string()),
            brands: product.brands.unwrap_or_default(),
            quantity: product.quantity.unwrap_or_default(),
            image_url: product.image_url.unwrap_or_default(),
            nutriments: product.nutriments.unwrap_or_default(),
            serving_size: product.serving_size.unwrap_or_default(),
        }
    }
}

/// Open Food Facts client. Every failure is reported as "not found".
pub struct OpenFoodFactsClient {
    base_url: String,
    client: reqwest::Client,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(PRODUCT_LOOKUP_TIMEOUT)
            .user_agent(concat!("calai-nutrition-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn product_url(&self, barcode: &str) -> String {
        format!("{}/api/v0/product/{}.json", self.base_url, barcode)
    }

    async fn fetch(&self, barcode: &str) -> Result<Option<ProductRecord>> {
        let response = self.client.get(self.product_url(barcode)).send().await?;

        if !response.status().is_success() {
            log::warn!("⚠️ Product lookup for {} returned HTTP {}", barcode, response.status());
            return Ok(None);
        }

        let body: LookupResponse = response.json().await?;
        if body.status != 1 {
            return Ok(None);
        }

        Ok(body.product.map(ProductRecord::from))
    }
}

#[async_trait::async_trait]
impl ProductLookup for OpenFoodFactsClient {
    async fn lookup(&self, barcode: &str) -> Result<Option<ProductRecord>> {
        match self.fetch(barcode).await {
            Ok(record) => Ok(record),
            Err(e) => {
                log::warn!("⚠️ Error looking up barcode {}: {}", barcode, e);
                Ok(None)
            }
        }
    }
}
