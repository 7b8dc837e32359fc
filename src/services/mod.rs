pub mod accounting;
pub mod barcode;
pub mod gemini; // Google Gemini REST client
pub mod image;
pub mod model;
pub mod openfoodfacts; // Packaged product database
pub mod parser;
pub mod prompt;

pub use gemini::GeminiClient;
pub use image::ImageFetcher;
pub use openfoodfacts::{OpenFoodFactsClient, ProductLookup};
pub use prompt::NutritionPromptBuilder;
