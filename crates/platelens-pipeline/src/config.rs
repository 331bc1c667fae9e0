use serde::{Deserialize, Serialize};

/// Tuning knobs for parsing and resolution. The defaults match the values the
/// pipeline was calibrated with, but none of them is structural.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Items below this model-reported confidence are dropped.
    pub confidence_threshold: f64,
    /// Smallest quantity an item may carry; smaller or invalid values clamp up.
    pub min_quantity: f64,
    /// Calories assigned when neither nutrient tier knows the food.
    pub fallback_calories: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            min_quantity: 0.1,
            fallback_calories: 250,
        }
    }
}
