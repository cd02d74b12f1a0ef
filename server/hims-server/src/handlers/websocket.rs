//! Live notification push
//!
//! Browsers cannot set headers on a WebSocket handshake, so the token travels
//! in the query string: `/ws/notifications?token=<jwt>`. Every notification
//! persisted for the caller afterwards is forwarded as a JSON [`Event`].

use auth_identity::Principal;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use events_bus::Event;
use futures::{sink::SinkExt, stream::StreamExt};
use logger_redacted::{redacted_info, redacted_warn, RedactedLogger};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::extract::Params;
use crate::server::HimsServer;

#[derive(Debug, Deserialize)]
pub struct SocketAuth {
    pub token: Option<String>,
}

/// Verify the token, then upgrade the connection
pub async fn notifications_socket(
    State(server): State<HimsServer>,
    Params(auth): Params<SocketAuth>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let token = auth
        .token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| ApiError::authentication("Missing token query parameter"))?;
    let principal = server.identity.tokens().verify(&token)?;
    Ok(ws.on_upgrade(move |socket| serve_socket(socket, server, principal)))
}

fn to_text(event: &Event) -> Option<Message> {
    serde_json::to_string(event).ok().map(Message::Text)
}

async fn serve_socket(socket: WebSocket, server: HimsServer, principal: Principal) {
    let logger = RedactedLogger::with_config("websocket", &server.settings.logging.redaction);
    let mut events = server.hub.subscribe(principal.user_id);
    let (mut sender, mut receiver) = socket.split();

    redacted_info!(logger, "Notification socket opened for {}", principal.email);

    let unread = server.hub.unread_count(principal.user_id).await.unwrap_or_default();
    let welcome = Event::new(
        "connected",
        json!({ "user_id": principal.user_id, "unread": unread }),
    );
    if let Some(message) = to_text(&welcome) {
        if sender.send(message).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            pushed = events.recv() => match pushed {
                Ok(event) => {
                    let Some(message) = to_text(&event) else { continue };
                    if sender.send(message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    redacted_warn!(
                        logger,
                        "Socket for {} skipped {} events",
                        principal.email,
                        skipped
                    );
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Ping(payload))) => {
                    if sender.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(other)) => debug!(?other, "Ignoring client message"),
                Some(Err(err)) => {
                    debug!(error = %err, "WebSocket receive failed");
                    break;
                }
            },
        }
    }

    redacted_info!(logger, "Notification socket closed for {}", principal.email);
}
