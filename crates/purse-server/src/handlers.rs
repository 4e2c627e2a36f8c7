//! Shared state and the HTTP/WebSocket side of the server.
//!
//! This module handles the donation feed connection lifecycle and the
//! health endpoint.

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use purse_core::{BalanceStore, BroadcastReport, SubscriberId, SubscriberRegistry};
use purse_protocol::DonationEvent;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared server state.
pub struct AppState {
    /// Account balances.
    pub store: BalanceStore,
    /// Open feed connections.
    pub registry: SubscriberRegistry,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            store: BalanceStore::new(),
            registry: SubscriberRegistry::new(),
            config,
        }
    }

    /// Fan `event` out to every feed subscriber.
    ///
    /// Returns `None` if the event could not be encoded.
    pub fn broadcast(&self, event: &DonationEvent) -> Option<BroadcastReport> {
        match self.registry.broadcast(event) {
            Ok(report) => {
                metrics::record_broadcast(report.delivered, report.pruned);
                Some(report)
            }
            Err(e) => {
                error!(error = %e, "Error encoding donation");
                metrics::record_error("encode");
                None
            }
        }
    }
}

/// Build the HTTP router: the feed endpoint plus `/health`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(&state.config.pubsub.path, get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "subscribers": state.registry.len(),
        "accounts": state.store.len(),
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, remote, state))
}

/// Handle a feed connection until it closes or fails.
async fn handle_websocket(socket: WebSocket, remote: SocketAddr, state: Arc<AppState>) {
    let _metrics_guard = ConnectionMetricsGuard::new();

    let (id, mut outbound) = state.registry.register(Some(remote));
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            biased;

            // Broadcasts queued for this subscriber. The queue only closes if
            // the subscriber is unregistered while this loop still runs.
            payload = outbound.recv() => {
                let Some(payload) = payload else {
                    debug!(subscriber = id, "Removed from registry");
                    break;
                };
                if let Err(e) = sender.send(Message::Text(payload.to_string())).await {
                    warn!(subscriber = id, error = %e, "Error sending message to feed subscriber");
                    metrics::record_error("websocket_write");
                    break;
                }
            }

            // Frames from the subscriber
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_donation(text.as_bytes(), id, &state);
                    }
                    Some(Ok(Message::Binary(data))) => {
                        handle_donation(&data, id, &state);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        debug!(subscriber = id, "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(subscriber = id, error = %e, "Error reading feed message");
                        metrics::record_error("websocket_read");
                        break;
                    }
                    None => {
                        debug!(subscriber = id, "Feed stream ended");
                        break;
                    }
                }
            }
        }
    }

    state.registry.unregister(id);
    let _ = sender.close().await;

    debug!(subscriber = id, remote = %remote, "Feed subscriber disconnected");
}

/// Decode an inbound donation and broadcast it. Bad payloads are dropped.
fn handle_donation(data: &[u8], id: SubscriberId, state: &AppState) {
    match DonationEvent::from_json(data) {
        Ok(event) => {
            if let Some(report) = state.broadcast(&event) {
                info!(
                    subscriber = id,
                    recipients = report.delivered,
                    "Broadcasting donation: {}",
                    event.summary()
                );
            }
        }
        Err(e) => {
            warn!(subscriber = id, error = %e, "Error parsing donation");
            metrics::record_error("donation_decode");
        }
    }
}
