//! HTTP surface for hosts that deliver input events over the network.
//!
//! A browser page or desktop hook POSTs raw input events; the server records
//! them in a shared [`Tracker`], forwards them to the classifier (when a
//! `classifier_url` is configured) and serves the current feature snapshot,
//! the latest prediction and the transparency counters.
//!
//! # Architecture
//!
//! ```text
//! Browser ──→ POST /events ──→ Tracker ──→ GatewayChannel ──→ classifier
//!                                 ▲                               │
//!   GET /snapshot, /prediction    └──── handle_message() ◀────────┘
//! ```

use crate::channel::{InboundMessage, MemorySink, PredictionPayload};
use crate::collector::types::InputEvent;
use crate::config::Config;
use crate::core::session::{RecordOutcome, SessionState};
use crate::core::snapshot::FeatureSnapshot;
use crate::gateway::{GatewayChannel, GatewayConfig, DEFAULT_GATEWAY_QUEUE_CAPACITY};
use crate::tracker::Tracker;
use crate::transparency::TransparencyStats;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Tracker settings
    pub config: Config,
}

impl ServerConfig {
    pub fn new(port: u16, config: Config) -> Self {
        Self { port, config }
    }
}

/// Classifier replies queued by the gateway forwarder.
type Replies = crossbeam_channel::Receiver<String>;

/// How often the reply pump re-checks for shutdown while the queue is idle.
const REPLY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared server state
pub struct ServerState {
    tracker: Mutex<Tracker>,
    sink: MemorySink,
}

impl ServerState {
    /// Build the tracker, attaching the gateway when a classifier URL is set.
    ///
    /// Returns the gateway reply queue so the caller can feed replies back.
    fn new(config: &Config) -> anyhow::Result<(Self, Option<Replies>)> {
        let sink = MemorySink::new();
        let mut tracker = Tracker::from_config(config, sink.clone());
        let mut replies = None;

        if config.classifier_url.is_some() {
            let gateway = GatewayChannel::spawn(
                GatewayConfig::from_config(config)?,
                DEFAULT_GATEWAY_QUEUE_CAPACITY,
            )?;
            tracing::info!(device_id = gateway.device_id(), "Forwarding events to classifier");
            replies = Some(gateway.messages());
            tracker = tracker.with_channel(gateway);
        }

        Ok((
            Self {
                tracker: Mutex::new(tracker),
                sink,
            },
            replies,
        ))
    }
}

/// One event or a batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EventBatch {
    One(InputEvent),
    Many(Vec<InputEvent>),
}

impl EventBatch {
    fn into_events(self) -> Vec<InputEvent> {
        match self {
            EventBatch::One(event) => vec![event],
            EventBatch::Many(events) => events,
        }
    }
}

/// Response from the events endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EventsResponse {
    pub recorded: usize,
    pub ignored: usize,
    pub state: SessionState,
}

/// Response from the session endpoints
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub state: SessionState,
    pub session_id: String,
}

/// Response from the messages endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionPayload>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn session_response(tracker: &Tracker) -> Json<SessionResponse> {
    Json(SessionResponse {
        state: tracker.state(),
        session_id: tracker.session().session_id().to_string(),
    })
}

/// POST /session/start
async fn start_session(State(state): State<Arc<ServerState>>) -> Json<SessionResponse> {
    let mut tracker = state.tracker.lock().await;
    tracker.start();
    session_response(&tracker)
}

/// POST /session/pause
async fn pause_session(State(state): State<Arc<ServerState>>) -> Json<SessionResponse> {
    let mut tracker = state.tracker.lock().await;
    tracker.pause();
    session_response(&tracker)
}

/// POST /session/reset
async fn reset_session(State(state): State<Arc<ServerState>>) -> Json<SessionResponse> {
    let mut tracker = state.tracker.lock().await;
    tracker.reset();
    session_response(&tracker)
}

/// POST /events
///
/// Accepts a single input event or an array of them, in arrival order.
async fn record_events(
    State(state): State<Arc<ServerState>>,
    Json(batch): Json<EventBatch>,
) -> Json<EventsResponse> {
    let mut tracker = state.tracker.lock().await;
    let (mut recorded, mut ignored) = (0, 0);
    for event in batch.into_events() {
        match tracker.record_event(event) {
            RecordOutcome::Recorded(_) => recorded += 1,
            RecordOutcome::Ignored(_) => ignored += 1,
        }
    }

    Json(EventsResponse {
        recorded,
        ignored,
        state: tracker.state(),
    })
}

/// POST /messages
///
/// Accepts a classifier message (for hosts that hold the classifier
/// connection themselves).
async fn classifier_message(
    State(state): State<Arc<ServerState>>,
    body: String,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut tracker = state.tracker.lock().await;
    let message = tracker.handle_message(&body).map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
                code: "INVALID_MESSAGE".to_string(),
            }),
        )
    })?;

    let prediction = match message {
        InboundMessage::Prediction(payload) => Some(payload),
        _ => None,
    };

    Ok(Json(MessageResponse {
        status: "ok".to_string(),
        prediction,
    }))
}

/// GET /snapshot
async fn snapshot(State(state): State<Arc<ServerState>>) -> Json<FeatureSnapshot> {
    let mut tracker = state.tracker.lock().await;
    Json(tracker.publish_snapshot())
}

/// GET /prediction
async fn prediction(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<PredictionPayload>, ApiError> {
    state.sink.latest_prediction().map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No prediction received yet".to_string(),
                code: "NO_PREDICTION".to_string(),
            }),
        )
    })
}

/// GET /stats
async fn stats(State(state): State<Arc<ServerState>>) -> Json<TransparencyStats> {
    Json(state.tracker.lock().await.stats())
}

/// Build the router over shared state.
fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session/start", post(start_session))
        .route("/session/pause", post(pause_session))
        .route("/session/reset", post(reset_session))
        .route("/events", post(record_events))
        .route("/messages", post(classifier_message))
        .route("/snapshot", get(snapshot))
        .route("/prediction", get(prediction))
        .route("/stats", get(stats))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Feed classifier replies from the gateway back into the tracker.
///
/// Holds the state weakly: once the server task has finished and dropped
/// the router, the tracker (and with it the gateway's outbound queue) is
/// released and the pump exits on its next poll.
fn spawn_reply_pump(state: Weak<ServerState>, replies: Replies, stopped: Arc<AtomicBool>) {
    tokio::task::spawn_blocking(move || {
        while !stopped.load(Ordering::SeqCst) {
            match replies.recv_timeout(REPLY_POLL_INTERVAL) {
                Ok(reply) => {
                    let Some(state) = state.upgrade() else { break };
                    let mut tracker = state.tracker.blocking_lock();
                    // Rejections are already logged by the tracker.
                    let _ = tracker.handle_message(&reply);
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    if state.strong_count() == 0 {
                        break;
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!("Reply pump stopped");
    });
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let (state, replies) = ServerState::new(&config.config)?;
    let state = Arc::new(state);
    let stopped = Arc::new(AtomicBool::new(false));
    if let Some(replies) = replies {
        spawn_reply_pump(Arc::downgrade(&state), replies, Arc::clone(&stopped));
    }

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Stress signal server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
        stopped.store(true, Ordering::SeqCst);
    });

    Ok((actual_addr, shutdown_tx))
}
