use platelens_core::{
    AnalysisMode, AnalysisResult, AnalyzedItem, ProgressUpdate, Stage, StageStatus,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct WsPayload {
    #[serde(default)]
    pub mode: Option<AnalysisMode>,
    pub hint: Option<String>,
    pub image_base64: Option<String>,
    pub image_mime: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsFrame {
    Progress {
        stage: Stage,
        status: StageStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        elapsed_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Result {
        analysis_id: String,
        items: Vec<AnalyzedItem>,
        total_calories: i64,
        is_empty_result: bool,
        model: String,
        total_ms: u64,
        raw_response: String,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        analysis_id: Option<String>,
        kind: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
}

impl WsFrame {
    pub fn progress(update: ProgressUpdate) -> Self {
        Self::Progress {
            stage: update.stage,
            status: update.status,
            elapsed_ms: update.elapsed_ms,
            detail: update.detail,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Error {
            analysis_id: None,
            kind: "invalid_request".to_string(),
            message: message.into(),
            raw_response: None,
        }
    }

    pub fn from_result(result: AnalysisResult) -> Self {
        match result {
            AnalysisResult::Success {
                analysis_id,
                items,
                total_calories,
                is_empty_result,
                timings,
                raw_response,
                model,
            } => Self::Result {
                analysis_id: analysis_id.to_string(),
                items,
                total_calories,
                is_empty_result,
                model: model.label,
                total_ms: timings.total().as_millis() as u64,
                raw_response,
            },
            AnalysisResult::Failure {
                analysis_id,
                error,
                raw_response,
                ..
            } => Self::Error {
                analysis_id: Some(analysis_id.to_string()),
                kind: error.kind().to_string(),
                message: error.to_string(),
                raw_response,
            },
        }
    }
}
