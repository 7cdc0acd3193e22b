//! Stream transport bridge
//!
//! Connects one duplex text stream (a websocket, a pipe, a test channel) to a
//! session. Outgoing frames are serialized [`ProgressEvent`]s; incoming
//! frames carry the user's reply to a pending input request.
//!
//! ```text
//! -> {"event": "user_response", "payload": {"content": "Blue"}}
//! <- {"event": "status", "payload": {"status": "THINKING"}}
//! <- {"event": "final_answer", "payload": {"content": "..."}}
//! ```

use std::sync::Arc;

use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::{EngineResult, ProgressEvent};

use super::orchestrator::SessionOrchestrator;

/// Frames a client may send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum IncomingFrame {
    /// Answer to the session's pending input request
    UserResponse {
        /// The user's reply
        content: String,
    },
}

impl IncomingFrame {
    /// Parse a text frame
    pub fn decode(text: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Serialize an event as an outgoing text frame
pub fn encode_event(event: &ProgressEvent) -> EngineResult<String> {
    Ok(serde_json::to_string(event)?)
}

/// Bridge a text stream to a session until the incoming side ends
///
/// Every event published for the session is forwarded to `outgoing`. Each
/// `user_response` frame resumes the session; frames that cannot be parsed
/// and resumes that are refused are answered with an `error` frame on this
/// stream only.
pub async fn serve_stream<S>(
    orchestrator: Arc<SessionOrchestrator>,
    session_id: Uuid,
    mut incoming: S,
    outgoing: mpsc::Sender<String>,
) -> EngineResult<()>
where
    S: Stream<Item = String> + Unpin + Send,
{
    let subscription = orchestrator.subscribe(&session_id).await?;
    let observer = subscription.id;
    tracing::debug!(session_id = %session_id, observer = %observer, "Stream attached");

    let forward_tx = outgoing.clone();
    let forwarder = tokio::spawn(async move {
        let mut events = Box::pin(subscription.into_stream());
        while let Some(event) = events.next().await {
            let frame = match encode_event(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode event");
                    continue;
                }
            };
            if forward_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    while let Some(text) = incoming.next().await {
        let result = match IncomingFrame::decode(&text) {
            Ok(IncomingFrame::UserResponse { content }) => orchestrator
                .resume_session(&session_id, &content)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::warn!(session_id = %session_id, error = %e, "Incoming frame rejected");
            let Ok(frame) = encode_event(&ProgressEvent::error(e.to_string())) else {
                continue;
            };
            if outgoing.send(frame).await.is_err() {
                break;
            }
        }
    }

    orchestrator.broadcaster().unsubscribe(&session_id, observer).await;
    forwarder.abort();
    tracing::debug!(session_id = %session_id, observer = %observer, "Stream detached");
    Ok(())
}
