//! Connection handlers for the Ofrezco Live server.
//!
//! This module handles the chat connection lifecycle and the interest
//! notification endpoints.

use crate::config::Config;
use crate::error::ApiError;
use crate::metrics::{self, ConnectionMetricsGuard};
use crate::store::SqliteStore;
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use live_protocol::{codec, Inbound, InterestSummary, ParticipantId, PollResponse};
use ofrezco_live_core::{
    Broker, CursorQuery, DeliveryReport, InterestId, InterestStore, MemoryStore, RoomKey,
    UserId,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Shared server state.
pub struct AppState {
    /// The chat broker.
    pub broker: Broker,
    /// Interest notification queries.
    pub notifications: CursorQuery,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config, store: Arc<dyn InterestStore>) -> Self {
        Self {
            broker: Broker::with_config(config.broker_config()),
            notifications: CursorQuery::new(store),
            config,
        }
    }
}

/// Open the configured interest store.
///
/// # Errors
///
/// Returns an error if a database is configured but unreachable.
pub async fn open_store(config: &Config) -> Result<Arc<dyn InterestStore>> {
    match &config.database.url {
        Some(url) => {
            let store = SqliteStore::connect(url, config.database.max_connections).await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("No database configured; interest queries will report nothing");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let store = open_store(&config).await?;
    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::new(config, store));
    let app = router(Arc::clone(&state));

    // Bind and serve
    let listener = TcpListener::bind(addr).await?;

    info!("Ofrezco Live listening on {}", addr);
    info!(
        "Chat endpoint: ws://{}{}",
        addr, state.config.transport.websocket_path
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    let chat_path = state.config.transport.websocket_path.clone();
    let poll_path = state.config.api_path("/interests/poll");
    let summary_path = state.config.api_path("/interests/my-offers");

    Router::new()
        .route(&chat_path, get(chat_handler))
        .route(&poll_path, get(poll_handler))
        .route(&summary_path, get(my_offers_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.broker.registry().stats();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": stats.room_count,
        "connections": stats.connection_count,
        "store": state.notifications.store().name(),
    }))
}

/// Query parameters of the chat endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatParams {
    /// The connecting participant.
    pub me: ParticipantId,
    /// The counterpart.
    pub other: ParticipantId,
}

/// WebSocket upgrade handler.
async fn chat_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ChatParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if RoomKey::derive(params.me, params.other).is_self_room() {
        return ApiError::BadRequest("Cannot open a chat with yourself").into_response();
    }

    ws.max_message_size(state.config.limits.max_message_size)
        .on_upgrade(move |socket| handle_chat(socket, state, params))
        .into_response()
}

/// Handle a chat connection.
async fn handle_chat(socket: WebSocket, state: Arc<AppState>, params: ChatParams) {
    // Record connection metrics
    let _metrics_guard = ConnectionMetricsGuard::new();

    // Registered here; unregistered when `session` drops on any exit path.
    let (session, mut outbound) = state.broker.open(params.me, params.other);
    let connection_id = session.id();
    metrics::set_active_rooms(state.broker.registry().room_count());

    debug!(
        connection = %connection_id,
        room = %session.key(),
        me = session.me(),
        other = session.other(),
        "WebSocket connected"
    );

    let (mut sender, mut receiver) = socket.split();

    let heartbeat = &state.config.heartbeat;
    let period = Duration::from_millis(heartbeat.interval_ms.max(1));
    let idle_timeout = Duration::from_millis(heartbeat.timeout_ms);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            biased;

            // Envelopes queued for this connection
            Some(envelope) = outbound.recv() => {
                match codec::encode(&envelope) {
                    Ok(text) => {
                        metrics::record_message(text.len(), "outbound");
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(connection = %connection_id, error = %e, "Failed to encode envelope");
                        metrics::record_error("encode");
                    }
                }
            }

            // Receive from WebSocket
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = Instant::now();
                        metrics::record_message(text.len(), "inbound");
                        record_delivery(session.receive_text(&text));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        last_seen = Instant::now();
                        metrics::record_message(data.len(), "inbound");
                        match Inbound::from_bytes(&data) {
                            Ok(inbound) => record_delivery(session.receive(inbound)),
                            Err(e) => {
                                debug!(connection = %connection_id, error = %e, "Discarded binary frame");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        last_seen = Instant::now();
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_seen = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection = %connection_id, "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(connection = %connection_id, error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                    None => {
                        debug!(connection = %connection_id, "WebSocket stream ended");
                        break;
                    }
                }
            }

            // Keep-alive
            _ = ticker.tick() => {
                if last_seen.elapsed() >= idle_timeout {
                    info!(connection = %connection_id, "Closing idle connection");
                    metrics::record_error("idle_timeout");
                    break;
                }
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(session);
    metrics::set_active_rooms(state.broker.registry().room_count());

    debug!(connection = %connection_id, "WebSocket disconnected");
}

fn record_delivery(report: Option<DeliveryReport>) {
    if let Some(report) = report {
        metrics::record_broadcast(&report);
    }
}

/// Resolve the caller from the identity header.
///
/// A missing or unparsable header means an anonymous caller.
fn caller_identity(headers: &HeaderMap, header: &str) -> Option<UserId> {
    headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Query parameters of the poll endpoint.
#[derive(Debug, Deserialize)]
pub struct PollParams {
    /// Highest interest id the caller has seen.
    pub last_id: InterestId,
}

/// Interest cursor poll handler.
async fn poll_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<PollParams>,
) -> Result<Json<PollResponse>, ApiError> {
    let caller = caller_identity(&headers, &state.config.identity.header);
    let response = state.notifications.poll(caller, params.last_id).await?;
    metrics::record_poll(response.has_new);
    Ok(Json(response))
}

/// Interest summary handler.
async fn my_offers_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<InterestSummary>>, ApiError> {
    let caller = caller_identity(&headers, &state.config.identity.header);
    Ok(Json(state.notifications.summary(caller).await?))
}
