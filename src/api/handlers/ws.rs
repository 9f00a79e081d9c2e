use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::api::ws_types::WsMessage;
use crate::AppState;

/// Client request narrowing the stream to some tickers. An empty list
/// restores the full feed.
#[derive(Debug, Deserialize)]
struct Subscribe {
    symbols: Vec<String>,
}

pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_alerts(socket, state))
}

fn wanted(symbols: &HashSet<String>, msg: &WsMessage) -> bool {
    match msg.symbol() {
        Some(sym) if !symbols.is_empty() => symbols.contains(&sym.to_uppercase()),
        _ => true,
    }
}

async fn stream_alerts(mut socket: WebSocket, state: AppState) {
    let mut rx = state.ws_tx.subscribe();
    let mut symbols: HashSet<String> = HashSet::new();
    tracing::info!("Alert stream client connected");

    loop {
        tokio::select! {
            event = rx.recv() => {
                let msg = match event {
                    Ok(msg) => msg,
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Alert stream client lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if !wanted(&symbols, &msg) {
                    continue;
                }
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize WsMessage");
                        continue;
                    }
                };
                if socket.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<Subscribe>(&text) {
                        Ok(sub) => {
                            symbols = sub.symbols.iter().map(|s| s.trim().to_uppercase()).collect();
                            tracing::debug!(count = symbols.len(), "Alert stream subscription updated");
                        }
                        Err(e) => tracing::debug!(error = %e, "Ignoring malformed subscribe message"),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::info!("Alert stream client disconnected");
}
