use std::env;
use std::sync::Arc;

use platelens_llm::{OllamaConfig, OllamaEngine, PrewarmingProvider};
use platelens_nutrients::{EmbeddedStore, FdcClient, NutrientResolver, RemoteNutrientSource};
use platelens_pipeline::{MealAnalyzer, PipelineConfig};
use tracing::warn;

pub struct AppState {
    pub analyzer: MealAnalyzer,
}

impl AppState {
    pub fn new() -> Self {
        let defaults = OllamaConfig::default();
        let ollama = OllamaConfig {
            host: env::var("OLLAMA_HOST").unwrap_or(defaults.host),
            model: env::var("PLATELENS_MODEL").unwrap_or(defaults.model),
        };
        let provider = Arc::new(PrewarmingProvider::new(Arc::new(OllamaEngine::new(ollama))));

        let fdc_key = env::var("FDC_API_KEY").unwrap_or_default();
        let remote: Option<Arc<dyn RemoteNutrientSource>> = if fdc_key.is_empty() {
            warn!("Remote nutrient fallback disabled: FDC_API_KEY not configured");
            None
        } else {
            Some(Arc::new(FdcClient::new(fdc_key)))
        };

        let config = PipelineConfig::default();
        let resolver = NutrientResolver::new(Arc::new(EmbeddedStore::new()), remote)
            .with_fallback_calories(config.fallback_calories);

        Self {
            analyzer: MealAnalyzer::new(provider, resolver, config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
