pub mod nutrition_handler;

pub use nutrition_handler::NutritionHandler;
