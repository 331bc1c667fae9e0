use std::time::Instant;

use platelens_core::{AnalysisError, MealImage};
use tracing::info;

use crate::session::{Generation, InferenceSession};

/// Submit the prompt and optional image to an owned session and block until
/// the engine produces a complete response. No retries: any failure is final
/// for this request and already classified into the analysis taxonomy by the
/// session implementation.
pub async fn invoke(
    session: &mut dyn InferenceSession,
    prompt: &str,
    image: Option<&MealImage>,
) -> Result<Generation, AnalysisError> {
    session.push_prompt(prompt);
    if let Some(image) = image {
        session.push_image(&image.bytes, &image.mime_type);
    }

    let started = Instant::now();
    let generation = session.generate().await?;

    info!(
        "INVOKER: model '{}' answered in {}ms ({} chars)",
        session.model_label(),
        started.elapsed().as_millis(),
        generation.text.len()
    );

    Ok(generation)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct RecordingSession {
        prompt: String,
        image_count: usize,
        fail_with: Option<AnalysisError>,
    }

    #[async_trait]
    impl InferenceSession for RecordingSession {
        fn model_label(&self) -> &str {
            "recording"
        }

        fn push_prompt(&mut self, text: &str) {
            self.prompt.push_str(text);
        }

        fn push_image(&mut self, _bytes: &[u8], _mime_type: &str) {
            self.image_count += 1;
        }

        async fn generate(&mut self) -> Result<Generation, AnalysisError> {
            if let Some(err) = self.fail_with.take() {
                return Err(err);
            }
            Ok(Generation {
                text: format!("echo: {}", self.prompt),
                eval_tokens: Some(4),
                tokens_per_sec: Some(10.0),
            })
        }

        fn close(&mut self) {}
    }

    #[tokio::test]
    async fn submits_prompt_and_image_before_generating() {
        let mut session = RecordingSession::default();
        let image = MealImage {
            bytes: vec![1, 2, 3],
            mime_type: "image/jpeg".to_string(),
        };

        let generation = invoke(&mut session, "identify the food", Some(&image))
            .await
            .unwrap();

        assert_eq!(session.prompt, "identify the food");
        assert_eq!(session.image_count, 1);
        assert!(generation.text.contains("identify the food"));
    }

    #[tokio::test]
    async fn engine_failures_pass_through_unretried() {
        let mut session = RecordingSession {
            fail_with: Some(AnalysisError::TokenLimitExceeded),
            ..Default::default()
        };

        let err = invoke(&mut session, "prompt", None).await.unwrap_err();
        assert_eq!(err, AnalysisError::TokenLimitExceeded);
    }
}
