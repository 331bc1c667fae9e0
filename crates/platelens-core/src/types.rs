use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::progress::StageTimings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// JSON array only, empty array allowed as a confident "nothing found".
    QuickStrict,
    /// Brief reasoning then a terminal JSON array.
    #[default]
    SingleShotReasoned,
    /// Extended visual description before the terminal JSON array.
    ChainOfThought,
}

impl AnalysisMode {
    /// Whether an explicitly empty decoded array is a valid zero-item success
    /// rather than a parse failure. Policy flag, never inferred from the name.
    pub fn empty_array_is_success(self) -> bool {
        matches!(self, AnalysisMode::QuickStrict)
    }

    /// Whether reasoning text preceding the terminal array should be split off
    /// and retained before decoding.
    pub fn extracts_reasoning(self) -> bool {
        matches!(self, AnalysisMode::ChainOfThought)
    }

    pub fn label(self) -> &'static str {
        match self {
            AnalysisMode::QuickStrict => "quick_strict",
            AnalysisMode::SingleShotReasoned => "single_shot_reasoned",
            AnalysisMode::ChainOfThought => "chain_of_thought",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MealImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// One user action's worth of input. Owned by a single analyze() call.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub image: Option<MealImage>,
    pub hint: Option<String>,
    pub mode: AnalysisMode,
}

/// A food item extracted from the model response, post-normalization.
/// Every instance satisfies `quantity > 0` and a non-blank `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

/// Where a nutrient record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientSource {
    Local,
    Remote,
    Estimate,
}

/// Resolved nutrition for one item, scaled to the requested quantity.
/// Optional fields are `None` when the source had no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientRecord {
    pub calories: i64,
    pub protein_g: Option<f64>,
    pub total_fat_g: Option<f64>,
    pub saturated_fat_g: Option<f64>,
    pub cholesterol_mg: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub total_carbs_g: Option<f64>,
    pub dietary_fiber_g: Option<f64>,
    pub sugars_g: Option<f64>,
    pub glycemic_index: Option<i64>,
    pub glycemic_load: Option<f64>,
    pub source: NutrientSource,
}

impl NutrientRecord {
    /// Record for an item no source knows about. Deterministic stand-in so a
    /// lookup miss never sinks the whole analysis.
    pub fn estimate(calories: i64) -> Self {
        Self {
            calories,
            protein_g: None,
            total_fat_g: None,
            saturated_fat_g: None,
            cholesterol_mg: None,
            sodium_mg: None,
            total_carbs_g: None,
            dietary_fiber_g: None,
            sugars_g: None,
            glycemic_index: None,
            glycemic_load: None,
            source: NutrientSource::Estimate,
        }
    }

    /// Scale per-serving values by a quantity factor. Glycemic index is a
    /// property of the food, not the portion, so it passes through; glycemic
    /// load scales with carbohydrate mass.
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |v: Option<f64>| v.map(|x| x * factor);
        Self {
            calories: (self.calories as f64 * factor).round() as i64,
            protein_g: scale(self.protein_g),
            total_fat_g: scale(self.total_fat_g),
            saturated_fat_g: scale(self.saturated_fat_g),
            cholesterol_mg: scale(self.cholesterol_mg),
            sodium_mg: scale(self.sodium_mg),
            total_carbs_g: scale(self.total_carbs_g),
            dietary_fiber_g: scale(self.dietary_fiber_g),
            sugars_g: scale(self.sugars_g),
            glycemic_index: self.glycemic_index,
            glycemic_load: scale(self.glycemic_load),
            source: self.source,
        }
    }
}

/// An identified item joined with its resolved nutrition; the externally
/// visible unit of a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedItem {
    pub item: IdentifiedItem,
    pub nutrients: NutrientRecord,
}

/// Model identity plus generation metrics when the engine reports them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelInfo {
    pub label: String,
    pub eval_tokens: Option<u32>,
    pub tokens_per_sec: Option<f64>,
}

/// Outcome of one analysis call. Exactly one variant per request; both carry
/// the timings collected up to the stopping point.
#[derive(Debug, Clone)]
pub enum AnalysisResult {
    Success {
        analysis_id: Uuid,
        items: Vec<AnalyzedItem>,
        total_calories: i64,
        /// True only when the mode treats an explicit empty array as a
        /// confident "nothing found".
        is_empty_result: bool,
        timings: StageTimings,
        raw_response: String,
        model: ModelInfo,
    },
    Failure {
        analysis_id: Uuid,
        error: AnalysisError,
        raw_response: Option<String>,
        timings: StageTimings,
    },
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success { .. })
    }

    pub fn timings(&self) -> &StageTimings {
        match self {
            AnalysisResult::Success { timings, .. } => timings,
            AnalysisResult::Failure { timings, .. } => timings,
        }
    }

    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AnalysisResult::Success { raw_response, .. } => Some(raw_response),
            AnalysisResult::Failure { raw_response, .. } => raw_response.as_deref(),
        }
    }
}
