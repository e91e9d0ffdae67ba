//! Boundary with the external classifier and the rendering layer.
//!
//! Outbound, recorded events are encoded into the classifier's flat wire
//! schema and pushed (fire-and-forget) through a [`ClassifierChannel`].
//! Inbound, classifier messages are parsed; predictions update the stress
//! feedback and are forwarded untouched to a [`RenderSink`].

pub mod message;
pub mod sink;
pub mod transport;
pub mod wire;

use thiserror::Error;

// Re-export commonly used types
pub use message::{InboundMessage, PredictionPayload, StressLevel};
pub use sink::{MemorySink, RenderSink, TracingSink};
pub use transport::{ClassifierChannel, QueueChannel};
pub use wire::{WireEncoder, WireEvent, WireEventType, WireModality};

/// Errors at the classifier boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChannelError {
    #[error("Classifier channel is disconnected")]
    Disconnected,
    #[error("Classifier channel is full")]
    Full,
    #[error("Malformed classifier message: {0}")]
    Malformed(String),
    #[error("Invalid prediction: {0}")]
    InvalidPrediction(String),
    #[error("Transport error: {0}")]
    Transport(String),
}
