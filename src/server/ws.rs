use anyhow::{Context, Result};
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;

use crate::logging;
use crate::model::QuoteBatch;

use super::metrics::MetricsEvent;
use super::AppState;

pub(super) async fn websocket_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        if let Err(err) = forward_batches_to_client(socket, state).await {
            logging::warn(
                "ws.client_error",
                "Websocket client ended with error",
                json!({ "error": format!("{err:?}") }),
            );
        }
    })
}

async fn forward_batches_to_client(socket: WebSocket, state: AppState) -> Result<()> {
    logging::info_simple("ws.client.connected", "Websocket client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut receiver = state.batches.subscribe();

    let reader = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    loop {
        match receiver.recv().await {
            Ok(batch) => {
                if batch.quotes.is_empty() {
                    continue;
                }
                let payload = serialize_batch(&batch)?;
                if ws_sender.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                state.metrics.report(MetricsEvent::ClientLag {
                    skipped: skipped as usize,
                    component: "ws_client",
                });
                logging::warn(
                    "ws.client.lagged",
                    "Websocket client lagged quote batches",
                    json!({ "skipped": skipped }),
                );
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    reader.abort();
    let _ = reader.await;
    logging::info_simple("ws.client.disconnected", "Websocket client disconnected");
    Ok(())
}

fn serialize_batch(batch: &QuoteBatch) -> Result<String> {
    serde_json::to_string(batch).context("serialize quote batch")
}
