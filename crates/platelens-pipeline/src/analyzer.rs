use std::sync::Arc;
use std::time::Instant;

use platelens_core::{
    AnalysisError, AnalysisRequest, AnalysisResult, ModelInfo, ProgressObserver, ProgressUpdate,
    Stage, StageTimings,
};
use platelens_llm::{invoke, SessionProvider};
use platelens_nutrients::NutrientResolver;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::builder::build_prompt;
use crate::config::PipelineConfig;
use crate::parser::parse_response;

/// Sequences the five pipeline stages for one request: acquire session, build
/// prompt, invoke, parse, resolve nutrients, assemble. Failures surface as
/// `AnalysisResult::Failure`, never as `Err`; the session guard's drop closes
/// the session on every path.
pub struct MealAnalyzer {
    provider: Arc<dyn SessionProvider>,
    resolver: NutrientResolver,
    config: PipelineConfig,
}

impl MealAnalyzer {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        resolver: NutrientResolver,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            resolver,
            config,
        }
    }

    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        observer: &dyn ProgressObserver,
    ) -> AnalysisResult {
        let analysis_id = Uuid::new_v4();
        let mut timings = StageTimings::new();

        info!(
            "ANALYZER: starting analysis {} (mode {}, image: {}, hint: {})",
            analysis_id,
            request.mode.label(),
            request.image.is_some(),
            request.hint.is_some(),
        );

        observer.on_progress(ProgressUpdate::started(Stage::AcquiringSession));
        let started = Instant::now();
        let session = self.provider.acquire().await;
        timings.record(Stage::AcquiringSession, started.elapsed());

        let mut session = match session {
            Ok(guard) => {
                observer.on_progress(ProgressUpdate::completed(
                    Stage::AcquiringSession,
                    started.elapsed(),
                ));
                guard
            }
            Err(e) => return self.failure(analysis_id, e, None, timings),
        };

        observer.on_progress(ProgressUpdate::started(Stage::BuildingPrompt));
        let started = Instant::now();
        let prompt = build_prompt(request.mode, request.hint.as_deref());
        timings.record(Stage::BuildingPrompt, started.elapsed());
        observer.on_progress(ProgressUpdate::completed(
            Stage::BuildingPrompt,
            started.elapsed(),
        ));

        observer.on_progress(ProgressUpdate::started(Stage::Invoking));
        let started = Instant::now();
        let generation = invoke(&mut *session, &prompt, request.image.as_ref()).await;
        timings.record(Stage::Invoking, started.elapsed());

        let generation = match generation {
            Ok(generation) => {
                observer.on_progress(ProgressUpdate::completed(
                    Stage::Invoking,
                    started.elapsed(),
                ));
                generation
            }
            Err(e) => return self.failure(analysis_id, e, None, timings),
        };

        let model = ModelInfo {
            label: session.model_label().to_string(),
            eval_tokens: generation.eval_tokens,
            tokens_per_sec: generation.tokens_per_sec,
        };
        // The engine has answered; releasing now lets the replacement session
        // start warming while parsing and resolution run.
        drop(session);

        observer.on_progress(ProgressUpdate::started(Stage::Parsing));
        let started = Instant::now();
        let parsed = parse_response(&generation.text, request.mode, &self.config);
        timings.record(Stage::Parsing, started.elapsed());

        let parsed = match parsed {
            Ok(parsed) => {
                observer.on_progress(ProgressUpdate::completed(Stage::Parsing, started.elapsed()));
                parsed
            }
            Err(e) => {
                return self.failure(analysis_id, e, Some(generation.text), timings);
            }
        };

        if let Some(reasoning) = &parsed.reasoning {
            debug!(
                "ANALYZER: model reasoning ({} chars): {}",
                reasoning.len(),
                &reasoning[..reasoning.len().min(120)]
            );
        }

        observer.on_progress(ProgressUpdate::started(Stage::ResolvingNutrients));
        let started = Instant::now();
        let items = self.resolver.resolve_all(&parsed.items, observer).await;
        timings.record(Stage::ResolvingNutrients, started.elapsed());
        observer.on_progress(ProgressUpdate::completed(
            Stage::ResolvingNutrients,
            started.elapsed(),
        ));

        observer.on_progress(ProgressUpdate::started(Stage::Assembling));
        let started = Instant::now();
        let total_calories = items.iter().map(|a| a.nutrients.calories).sum();
        timings.record(Stage::Assembling, started.elapsed());
        observer.on_progress(ProgressUpdate::completed(
            Stage::Assembling,
            started.elapsed(),
        ));

        info!(
            "ANALYZER: analysis {} complete: {} item(s), {} kcal, {}ms total",
            analysis_id,
            items.len(),
            total_calories,
            timings.total().as_millis()
        );

        AnalysisResult::Success {
            analysis_id,
            items,
            total_calories,
            is_empty_result: parsed.is_empty_result,
            timings,
            raw_response: generation.text,
            model,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn failure(
        &self,
        analysis_id: Uuid,
        error: AnalysisError,
        raw_response: Option<String>,
        timings: StageTimings,
    ) -> AnalysisResult {
        error!(
            "ANALYZER: analysis {} failed ({}): {}",
            analysis_id,
            error.kind(),
            error
        );
        AnalysisResult::Failure {
            analysis_id,
            error,
            raw_response,
            timings,
        }
    }
}
