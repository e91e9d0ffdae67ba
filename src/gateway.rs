//! HTTP transport to a remote stress classifier.
//!
//! [`GatewayChannel`] is a [`ClassifierChannel`] that hands wire events to a
//! background forwarder thread. The forwarder POSTs each event to the
//! classifier's `/v1/events` endpoint; any message the classifier returns in
//! the response body (typically a prediction) is queued for the host to pass
//! to [`Tracker::handle_message`](crate::tracker::Tracker::handle_message).
//!
//! ```text
//! Tracker ──send()──▶ [outbound queue] ──▶ forwarder ──POST──▶ classifier
//!    ▲                                         │
//!    └──handle_message()── [inbound queue] ◀───┘ (response body)
//! ```
//!
//! # HTTP bridge contract
//!
//! The reference classifier streams over a WebSocket at `/ws/track` and
//! pushes predictions as socket messages. This client speaks plain HTTP
//! instead, so it expects a relay (or a classifier build) that exposes:
//!
//! - `POST /v1/events` taking one JSON [`WireEvent`] per request and answering
//!   with either an empty body or the JSON message the socket would have
//!   pushed for that event (`{"type": "prediction", ...}` and friends)
//! - `GET /health` returning 2xx when the classifier is reachable

use crate::channel::{ChannelError, ClassifierChannel, WireEvent};
use crate::config::Config;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;

/// Default capacity of the outbound and inbound gateway queues.
pub const DEFAULT_GATEWAY_QUEUE_CAPACITY: usize = 1024;

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Classifier base URL, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Optional bearer token
    pub token: Option<String>,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build from the `classifier_url` setting.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let url = config
            .classifier_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GatewayError::Config("classifier_url is not set".to_string()))?;

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(GatewayError::Config(format!(
                "classifier_url must be an http(s) URL, got '{url}'"
            )));
        }

        Ok(Self::new(url))
    }

    /// Base URL without a trailing slash.
    pub fn url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Event ingest endpoint.
    pub fn events_url(&self) -> String {
        format!("{}/v1/events", self.url())
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.url())
    }
}

/// Gateway client error types.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway config error: {0}")]
    Config(String),
    #[error("Gateway network error: {0}")]
    Network(String),
    #[error("Gateway server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Gateway serialization error: {0}")]
    Serialization(String),
}

/// Async client for the classifier's HTTP API.
pub struct GatewayClient {
    config: GatewayConfig,
    client: reqwest::Client,
    device_id: String,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Device ID from hostname + instance
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let device_id = format!(
            "stress-agent-{}-{}",
            hostname,
            &uuid::Uuid::new_v4().to_string()[..8]
        );

        Ok(Self {
            config,
            client,
            device_id,
        })
    }

    /// Check that the classifier answers its health endpoint.
    pub async fn test_connection(&self) -> Result<bool, GatewayError> {
        let response = self
            .client
            .get(self.config.health_url())
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    /// POST one event. Returns the response body when the classifier sent one.
    pub async fn post_event(&self, event: &WireEvent) -> Result<Option<String>, GatewayError> {
        let mut request = self
            .client
            .post(self.config.events_url())
            .header("X-Device-Id", &self.device_id)
            .json(event);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(Some(body).filter(|b| !b.trim().is_empty()))
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Classifier channel that forwards events over HTTP from a worker thread.
pub struct GatewayChannel {
    outbound: Sender<WireEvent>,
    inbound: Receiver<String>,
    failures: Arc<AtomicU64>,
    disconnected: bool,
    device_id: String,
    _worker: JoinHandle<()>,
}

impl GatewayChannel {
    /// Start the forwarder thread.
    pub fn spawn(config: GatewayConfig, capacity: usize) -> Result<Self, GatewayError> {
        let client = GatewayClient::new(config)?;
        let device_id = client.device_id().to_string();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create runtime: {e}")))?;

        let (outbound, events) = bounded::<WireEvent>(capacity);
        let (replies, inbound) = bounded::<String>(capacity);
        let failures = Arc::new(AtomicU64::new(0));
        let worker_failures = Arc::clone(&failures);

        let worker = std::thread::Builder::new()
            .name("classifier-gateway".to_string())
            .spawn(move || {
                tracing::debug!(url = %client.config().events_url(), "Gateway forwarder started");
                for event in events.iter() {
                    match runtime.block_on(client.post_event(&event)) {
                        Ok(Some(body)) => {
                            if replies.try_send(body).is_err() {
                                tracing::warn!("Dropping classifier reply: inbound queue full");
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            worker_failures.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!("Failed to post event to classifier: {e}");
                        }
                    }
                }
                tracing::debug!("Gateway forwarder stopped");
            })
            .map_err(|e| GatewayError::Config(format!("Failed to spawn forwarder: {e}")))?;

        Ok(Self {
            outbound,
            inbound,
            failures,
            disconnected: false,
            device_id,
            _worker: worker,
        })
    }

    /// Next classifier reply, if one has arrived.
    pub fn try_recv_message(&self) -> Option<String> {
        self.inbound.try_recv().ok()
    }

    /// Receiver for classifier replies, for hosts that select over several queues.
    pub fn messages(&self) -> Receiver<String> {
        self.inbound.clone()
    }

    /// Number of POSTs that failed in the forwarder.
    pub fn failed_posts(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl ClassifierChannel for GatewayChannel {
    fn send(&mut self, event: &WireEvent) -> Result<(), ChannelError> {
        match self.outbound.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ChannelError::Full),
            Err(TrySendError::Disconnected(_)) => {
                self.disconnected = true;
                Err(ChannelError::Disconnected)
            }
        }
    }

    fn is_connected(&self) -> bool {
        !self.disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_url() {
        let config = GatewayConfig::new("http://127.0.0.1:8000/");
        assert_eq!(config.url(), "http://127.0.0.1:8000");
        assert_eq!(config.events_url(), "http://127.0.0.1:8000/v1/events");
        assert_eq!(config.health_url(), "http://127.0.0.1:8000/health");
    }

    #[test]
    fn test_config_from_settings() {
        let mut settings = Config::default();
        assert!(matches!(
            GatewayConfig::from_config(&settings),
            Err(GatewayError::Config(_))
        ));

        settings.classifier_url = Some("ws://localhost:8000".to_string());
        assert!(GatewayConfig::from_config(&settings).is_err());

        settings.classifier_url = Some(" https://classifier.local ".to_string());
        let config = GatewayConfig::from_config(&settings).unwrap();
        assert_eq!(config.events_url(), "https://classifier.local/v1/events");
        assert_eq!(config.token, None);
    }

    #[test]
    fn test_channel_queues_without_blocking() {
        use crate::channel::WireEncoder;
        use crate::collector::types::KeyEvent;
        use crate::core::session::RecordedEvent;

        // Nothing listens on the discard port; the send must still return at once.
        let mut channel =
            GatewayChannel::spawn(GatewayConfig::new("http://127.0.0.1:9"), 8).unwrap();
        let event = WireEncoder::new(chrono::Utc::now()).encode(&RecordedEvent {
            event: KeyEvent::down("a", "KeyA", 0).into(),
            movement_speed: None,
        });

        assert!(channel.send(&event).is_ok());
        assert!(channel.is_connected());
        assert!(channel.device_id().starts_with("stress-agent-"));
        assert_eq!(channel.try_recv_message(), None);
    }
}
