use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::jwt::verify_token;
use crate::services::changes::UserChanges;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Streams the caller's own change events so clients can refetch streak and
/// calendar data without polling.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    // Browsers cannot set headers on the upgrade request
    let user_id = match authenticate_ws(&state, query.token.as_deref()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("WebSocket auth failed: {}", e);
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

fn authenticate_ws(state: &AppState, token: Option<&str>) -> Result<Uuid, &'static str> {
    let token = token.ok_or("Missing token query parameter")?;
    let token_data = verify_token(token, &state.config).map_err(|_| "Invalid or expired token")?;
    Ok(token_data.claims.sub)
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (sender, receiver) = socket.split();

    tracing::debug!(user_id = %user_id, "WebSocket connection established");

    let changes = state.changes.on_change(user_id);
    let changes = forward_changes(changes, sender, receiver).await;
    state.changes.off_change(changes);

    tracing::debug!(user_id = %user_id, "WebSocket connection closed");
}

/// Pushes the user's change events to the client until either side goes away.
/// Hands the subscription back so the caller can release it.
async fn forward_changes<S, R, E>(
    mut changes: UserChanges,
    mut sender: S,
    mut receiver: R,
) -> UserChanges
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
{
    loop {
        tokio::select! {
            event = changes.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode change event");
                        continue;
                    }
                };
                if sender.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    changes
}
