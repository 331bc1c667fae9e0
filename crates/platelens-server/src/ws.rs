use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use base64::{engine::general_purpose, Engine};
use futures::{SinkExt, StreamExt};
use platelens_core::{AnalysisRequest, MealImage, ProgressObserver, ProgressUpdate};
use tracing::{error, info};

use crate::protocol::{WsFrame, WsPayload};
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            continue;
        };

        let payload: WsPayload = match serde_json::from_str(&text) {
            Ok(p) => p,
            Err(e) => {
                error!("JSON parse error: {}", e);
                if send_frame(&mut sender, &WsFrame::rejected(e.to_string()))
                    .await
                    .is_err()
                {
                    return;
                }
                continue;
            }
        };

        let request = match build_request(payload) {
            Ok(request) => request,
            Err(message) => {
                if send_frame(&mut sender, &WsFrame::rejected(message))
                    .await
                    .is_err()
                {
                    return;
                }
                continue;
            }
        };

        info!(
            "Processing analysis request (mode {}, image: {})",
            request.mode.label(),
            request.image.is_some()
        );

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProgressUpdate>();
        let observer = ChannelObserver(tx);

        let analyze = state.analyzer.analyze(request, &observer);
        tokio::pin!(analyze);

        let result = loop {
            tokio::select! {
                result = &mut analyze => break result,
                Some(update) = rx.recv() => {
                    if send_frame(&mut sender, &WsFrame::progress(update)).await.is_err() {
                        // Client went away; finish the analysis so the session
                        // guard still runs its course, then drop the result.
                        let _ = (&mut analyze).await;
                        return;
                    }
                }
            }
        };

        // Flush progress that raced the final result.
        while let Ok(update) = rx.try_recv() {
            if send_frame(&mut sender, &WsFrame::progress(update)).await.is_err() {
                return;
            }
        }

        if send_frame(&mut sender, &WsFrame::from_result(result))
            .await
            .is_err()
        {
            return;
        }
    }

    info!("Connection closed");
}

/// Forwards pipeline progress into the socket task without blocking it.
struct ChannelObserver(tokio::sync::mpsc::UnboundedSender<ProgressUpdate>);

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, update: ProgressUpdate) {
        let _ = self.0.send(update);
    }
}

fn build_request(payload: WsPayload) -> Result<AnalysisRequest, String> {
    let image = match payload.image_base64 {
        Some(encoded) => {
            let bytes = general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| format!("image_base64 is not valid base64: {e}"))?;
            Some(MealImage {
                bytes,
                mime_type: payload
                    .image_mime
                    .unwrap_or_else(|| "image/jpeg".to_string()),
            })
        }
        None => None,
    };

    let hint = payload
        .hint
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty());

    if image.is_none() && hint.is_none() {
        return Err("request needs an image, a meal description, or both".to_string());
    }

    Ok(AnalysisRequest {
        image,
        hint,
        mode: payload.mode.unwrap_or_default(),
    })
}

async fn send_frame(
    sender: &mut (impl SinkExt<Message> + Unpin),
    frame: &WsFrame,
) -> Result<(), ()> {
    let Ok(json) = serde_json::to_string(frame) else {
        return Err(());
    };
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_requires_some_input() {
        let payload = WsPayload {
            mode: None,
            hint: Some("   ".to_string()),
            image_base64: None,
            image_mime: None,
        };
        assert!(build_request(payload).is_err());
    }

    #[test]
    fn request_decodes_image_and_defaults_mime() {
        let payload = WsPayload {
            mode: None,
            hint: None,
            image_base64: Some(general_purpose::STANDARD.encode([1u8, 2, 3])),
            image_mime: None,
        };
        let request = build_request(payload).unwrap();
        let image = request.image.unwrap();
        assert_eq!(image.bytes, vec![1, 2, 3]);
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[test]
    fn request_rejects_bad_base64() {
        let payload = WsPayload {
            mode: None,
            hint: None,
            image_base64: Some("not base64!!!".to_string()),
            image_mime: None,
        };
        assert!(build_request(payload).is_err());
    }
}
