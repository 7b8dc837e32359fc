pub mod nutrition;
pub mod request;
pub mod response;

pub use nutrition::{NutritionIngredient, NutritionResult, Portion, MAX_CONFIDENCE_SCORE};
pub use request::{AnalysisRequest, ImageSource, ScanMode};
pub use response::{ServiceMetadata, ServiceResponse, TokenUsage};
