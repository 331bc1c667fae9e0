use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use platelens_core::AnalysisError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::session::{Generation, InferenceSession, SessionFactory};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "gemma3:4b".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OllamaMetrics {
    #[serde(default)]
    eval_count: u32,
    #[serde(default)]
    eval_duration: u64,
}

impl OllamaMetrics {
    fn tokens_per_sec(&self) -> f64 {
        if self.eval_duration == 0 {
            return 0.0;
        }
        (self.eval_count as f64) / (self.eval_duration as f64 / 1_000_000_000.0)
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaResponseMessage>,
    #[serde(flatten)]
    metrics: OllamaMetrics,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

/// Session factory backed by a local Ollama runtime.
pub struct OllamaEngine {
    client: Client,
    host: String,
    model: String,
}

impl OllamaEngine {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: Client::new(),
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model,
        }
    }
}

#[async_trait]
impl SessionFactory for OllamaEngine {
    async fn create(&self) -> Result<Box<dyn InferenceSession>, AnalysisError> {
        // An empty message list makes the runtime load the model weights
        // without generating; this is the expensive part of session creation.
        let url = format!("{}/api/chat", self.host);
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: Vec::new(),
            stream: false,
        };

        self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Session(e.to_string()))?
            .error_for_status()
            .map_err(|e| AnalysisError::Session(e.to_string()))?;

        Ok(Box::new(OllamaSession {
            client: self.client.clone(),
            host: self.host.clone(),
            model: self.model.clone(),
            prompt: String::new(),
            images: Vec::new(),
            consumed: false,
            closed: false,
        }))
    }
}

pub struct OllamaSession {
    client: Client,
    host: String,
    model: String,
    prompt: String,
    images: Vec<String>,
    consumed: bool,
    closed: bool,
}

#[async_trait]
impl InferenceSession for OllamaSession {
    fn model_label(&self) -> &str {
        &self.model
    }

    fn push_prompt(&mut self, text: &str) {
        if !self.prompt.is_empty() {
            self.prompt.push('\n');
        }
        self.prompt.push_str(text);
    }

    fn push_image(&mut self, bytes: &[u8], _mime_type: &str) {
        // The runtime takes raw base64 and sniffs the format itself.
        self.images.push(general_purpose::STANDARD.encode(bytes));
    }

    async fn generate(&mut self) -> Result<Generation, AnalysisError> {
        if self.closed {
            return Err(AnalysisError::Session("session is closed".into()));
        }
        if self.consumed {
            return Err(AnalysisError::Session(
                "single-use session already consumed".into(),
            ));
        }
        if self.prompt.trim().is_empty() {
            return Err(AnalysisError::Session("no prompt submitted".into()));
        }
        self.consumed = true;

        let url = format!("{}/api/chat", self.host);
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: std::mem::take(&mut self.prompt),
                images: std::mem::take(&mut self.images),
            }],
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Inference(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_engine_error(status, &body));
        }

        let resp: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Inference(e.to_string()))?;

        let text = resp.message.map(|m| m.content).unwrap_or_default();

        info!(
            "OLLAMA: {} eval tokens, {:.1} tok/s",
            resp.metrics.eval_count,
            resp.metrics.tokens_per_sec()
        );

        let has_metrics = resp.metrics.eval_duration > 0;
        Ok(Generation {
            text,
            eval_tokens: has_metrics.then_some(resp.metrics.eval_count),
            tokens_per_sec: has_metrics.then(|| resp.metrics.tokens_per_sec()),
        })
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

fn classify_engine_error(status: u16, body: &str) -> AnalysisError {
    let lowered = body.to_lowercase();
    if lowered.contains("context length")
        || lowered.contains("context window")
        || lowered.contains("token limit")
    {
        AnalysisError::TokenLimitExceeded
    } else if status == 400 || status == 404 {
        AnalysisError::Session(format!("engine rejected request ({status}): {body}"))
    } else {
        AnalysisError::Inference(format!("engine error ({status}): {body}"))
    }
}
