// rest_api/src/realtime.rs

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lib::notifications::{Channel, NotificationHub, RealtimeEvent};
use security::{authenticate_bearer, AuthUser};

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RealtimeParams {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Join,
    Leave,
}

#[derive(Debug, Deserialize)]
struct ClientFrame {
    action: Action,
    channel: Channel,
}

#[derive(Debug, Serialize)]
struct ServerFrame<'a> {
    event: &'a str,
    channel: Channel,
    data: &'a Value,
}

fn encode(event: &RealtimeEvent) -> serde_json::Result<String> {
    serde_json::to_string(&ServerFrame { event: &event.name, channel: event.channel, data: &event.payload })
}

/// `GET /realtime`. The token comes from `?token=` or the bearer header and
/// is checked before the upgrade.
pub async fn realtime_handler(
    State(state): State<AppState>,
    Query(params): Query<RealtimeParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let bearer = params.token.map(|token| format!("Bearer {}", token));
    let header = bearer
        .as_deref()
        .or_else(|| headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()));
    let user = authenticate_bearer(&state.tokens, header)?;
    let hub = state.notifier.clone();
    Ok(ws.on_upgrade(move |socket| serve_socket(socket, hub, user)))
}

/// Forwards one channel into the connection's outbound queue. Lagging skips
/// the missed events.
fn forward(hub: &NotificationHub, channel: Channel, outbound: mpsc::UnboundedSender<RealtimeEvent>) -> JoinHandle<()> {
    let mut rx = hub.subscribe(channel);
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if outbound.send(event).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!("Subscriber on {} skipped {} events", channel, skipped),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn serve_socket(mut socket: WebSocket, hub: Arc<NotificationHub>, user: AuthUser) {
    info!("Realtime connection opened for {} {}", user.role, user.id);
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<RealtimeEvent>();
    let mut subscriptions: HashMap<Channel, JoinHandle<()>> = HashMap::new();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!("Realtime socket error for {}: {}", user.id, e);
                        break;
                    }
                };
                match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(ClientFrame { action: Action::Join, channel }) => {
                        subscriptions
                            .entry(channel)
                            .or_insert_with(|| forward(&hub, channel, outbound_tx.clone()));
                    }
                    Ok(ClientFrame { action: Action::Leave, channel }) => {
                        if let Some(handle) = subscriptions.remove(&channel) {
                            handle.abort();
                        }
                    }
                    Err(e) => debug!("Ignoring malformed realtime frame from {}: {}", user.id, e),
                }
            }
            Some(event) = outbound_rx.recv() => {
                let text = match encode(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Could not encode realtime event {}: {}", event.name, e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }

    for (_, handle) in subscriptions {
        handle.abort();
    }
    info!("Realtime connection closed for {}", user.id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_frames_name_an_action_and_channel() {
        let frame: ClientFrame = serde_json::from_str(r#"{"action":"join","channel":"dashboard"}"#).unwrap();
        assert_eq!(frame.action, Action::Join);
        assert_eq!(frame.channel, Channel::Dashboard);
        assert!(serde_json::from_str::<ClientFrame>(r#"{"action":"join","channel":"billing"}"#).is_err());
    }

    #[test]
    fn server_frames_carry_event_channel_and_data() {
        let event = RealtimeEvent::new(Channel::Appointments, "appointments:created", json!({"id": "a1"}));
        let frame: Value = serde_json::from_str(&encode(&event).unwrap()).unwrap();
        assert_eq!(frame, json!({"event": "appointments:created", "channel": "appointments", "data": {"id": "a1"}}));
    }
}
