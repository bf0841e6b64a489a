use super::handlers::resolve_ask_session;
use super::state::AppState;
use crate::hub::{InboundCommand, ObserverId, OutboundEvent};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use base64::Engine;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// GET /ws
/// Upgrade to the realtime observer channel.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<OutboundEvent>();
    let observer_id = state.hub.register(events_tx);
    info!("websocket observer {} connected", observer_id.as_str());

    let (mut sink, mut stream) = socket.split();

    // Writer: hub events out to the socket, serialized as {type, data}.
    let writer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!("failed to serialize outbound event: {err}");
                    continue;
                }
            };
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    // Reader: inbound commands until the client goes away.
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<InboundCommand>(&text) {
                Ok(command) => dispatch_command(&state, &observer_id, command).await,
                Err(err) => {
                    debug!("ignoring unparseable command: {err}");
                }
            },
            Ok(Message::Pong(_)) => state.hub.acknowledge(&observer_id),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    info!("websocket observer {} disconnected", observer_id.as_str());
    state.hub.unregister(&observer_id);
    writer.abort();
}

async fn dispatch_command(state: &AppState, observer_id: &ObserverId, command: InboundCommand) {
    match command {
        InboundCommand::StartListening => {
            if let Err(err) = state.controller.start().await {
                warn!("start-listening failed: {err:#}");
            }
        }
        InboundCommand::StopListening => {
            if let Err(err) = state.controller.stop().await {
                warn!("stop-listening failed: {err:#}");
            }
        }
        InboundCommand::AskQuestion {
            question,
            session_id,
        } => {
            // Answered off the reader loop so a long completion cannot block
            // further commands from this client.
            let state = state.clone();
            tokio::spawn(async move {
                let session_id = match resolve_ask_session(&state, session_id).await {
                    Ok(id) => id,
                    Err(err) => {
                        warn!("could not resolve ask session: {err}");
                        state.hub.broadcast(OutboundEvent::ChatError {
                            error: err.to_string(),
                        });
                        return;
                    }
                };
                // Failures already surface as chat-error events.
                let _ = state.assistant.handle_question(&session_id, &question).await;
            });
        }
        InboundCommand::MicAudio { data, mime_type } => {
            match base64::engine::general_purpose::STANDARD.decode(&data) {
                Ok(bytes) => {
                    if let Err(err) = state.controller.feed_audio(&bytes, &mime_type).await {
                        warn!("failed to feed audio chunk: {err}");
                    }
                }
                Err(err) => debug!("dropping undecodable audio chunk: {err}"),
            }
        }
        InboundCommand::Pong => state.hub.acknowledge(observer_id),
    }
}
