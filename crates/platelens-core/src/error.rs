use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("prompt exceeded the model context window")]
    TokenLimitExceeded,

    #[error("inference session failure: {0}")]
    Session(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response contained multiple JSON arrays")]
    MultipleArrays,

    #[error("response appears truncated")]
    Truncated,

    #[error("no food items identified with sufficient confidence")]
    NoItemsIdentified,
}

impl AnalysisError {
    /// Stable machine-readable tag, used in log lines and wire frames.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::TokenLimitExceeded => "token_limit_exceeded",
            AnalysisError::Session(_) => "session_error",
            AnalysisError::Inference(_) => "inference_error",
            AnalysisError::InvalidJson(_) => "invalid_json",
            AnalysisError::MultipleArrays => "multiple_arrays",
            AnalysisError::Truncated => "truncated",
            AnalysisError::NoItemsIdentified => "no_items_identified",
        }
    }

    /// Failure kinds raised by the response parser rather than the engine.
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidJson(_)
                | AnalysisError::MultipleArrays
                | AnalysisError::Truncated
                | AnalysisError::NoItemsIdentified
        )
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::InvalidJson(err.to_string())
    }
}
