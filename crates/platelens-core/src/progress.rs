use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AcquiringSession,
    BuildingPrompt,
    Invoking,
    Parsing,
    ResolvingNutrients,
    Assembling,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::AcquiringSession => "acquiring_session",
            Stage::BuildingPrompt => "building_prompt",
            Stage::Invoking => "invoking",
            Stage::Parsing => "parsing",
            Stage::ResolvingNutrients => "resolving_nutrients",
            Stage::Assembling => "assembling",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    InProgress,
    Completed,
}

/// Snapshot handed to the observer at every stage boundary and lookup sub-step.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub stage: Stage,
    pub status: StageStatus,
    pub elapsed_ms: Option<u64>,
    pub detail: Option<String>,
}

impl ProgressUpdate {
    pub fn started(stage: Stage) -> Self {
        Self {
            stage,
            status: StageStatus::InProgress,
            elapsed_ms: None,
            detail: None,
        }
    }

    pub fn completed(stage: Stage, elapsed: Duration) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            elapsed_ms: Some(elapsed.as_millis() as u64),
            detail: None,
        }
    }

    pub fn detail(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::InProgress,
            elapsed_ms: None,
            detail: Some(detail.into()),
        }
    }
}

/// Passive observer invoked from the pipeline's executing task. Implementations
/// must not block; the pipeline ignores any effect they have.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: ProgressUpdate);
}

/// Observer that discards everything.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _update: ProgressUpdate) {}
}

/// Per-stage elapsed durations for one analysis call. Append-only; a stage
/// appears at most once.
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    entries: Vec<(Stage, Duration)>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        self.entries.push((stage, elapsed));
    }

    pub fn get(&self, stage: Stage) -> Option<Duration> {
        self.entries
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, d)| *d)
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.get(stage).is_some()
    }

    pub fn entries(&self) -> &[(Stage, Duration)] {
        &self.entries
    }

    pub fn total(&self) -> Duration {
        self.entries.iter().map(|(_, d)| *d).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timings_preserve_recording_order() {
        let mut timings = StageTimings::new();
        timings.record(Stage::AcquiringSession, Duration::from_millis(5));
        timings.record(Stage::BuildingPrompt, Duration::from_millis(1));

        let stages: Vec<Stage> = timings.entries().iter().map(|(s, _)| *s).collect();
        assert_eq!(stages, vec![Stage::AcquiringSession, Stage::BuildingPrompt]);
        assert_eq!(timings.total(), Duration::from_millis(6));
        assert!(!timings.contains(Stage::ResolvingNutrients));
    }

    #[test]
    fn completed_update_carries_elapsed_ms() {
        let update = ProgressUpdate::completed(Stage::Invoking, Duration::from_millis(1234));
        assert_eq!(update.status, StageStatus::Completed);
        assert_eq!(update.elapsed_ms, Some(1234));
    }
}
