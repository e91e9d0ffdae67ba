//! Stress Signal Agent - behavioral stress signals from keyboard and pointer input.
//!
//! This library turns a raw stream of keyboard and pointer events into a
//! small set of derived signals (typing speed, correction rate, pointer path
//! randomness, click frequency, click pressure) that a remote classifier uses
//! to estimate stress. The classifier's prediction is fed back into pressure
//! simulation.
//!
//! # Data Handling
//!
//! - **Bounded memory**: the pointer buffer is capped and evicts oldest-first
//! - **Session scoped**: nothing is persisted; reset discards every event
//! - **Transparency**: every recorded, ignored and forwarded event is counted
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       Stress Signal Agent                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌─────────────────┐   ┌──────────────────┐      │
//! │  │ Collector │──▶│ TrackingSession │──▶│ FeatureSnapshot  │──▶ sink
//! │  │  (queue)  │   │ keyboard/pointer│   │   (assemble)     │      │
//! │  └───────────┘   └─────────────────┘   └──────────────────┘      │
//! │                          │   ▲                                   │
//! │                  encode  ▼   │ stress feedback                   │
//! │                  ┌──────────────────┐                            │
//! │                  │ ClassifierChannel│◀── predictions             │
//! │                  └──────────────────┘                            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use stress_signal_agent::{KeyEvent, SessionOptions, Tracker, TracingSink};
//!
//! let mut tracker = Tracker::new(SessionOptions::default(), TracingSink);
//! tracker.start();
//! for at in [0, 200, 400, 600, 800] {
//!     tracker.record_event(KeyEvent::down("a", "KeyA", at).into());
//! }
//! assert_eq!(tracker.snapshot().typing_speed_wpm, 75.0);
//! ```

pub mod channel;
pub mod collector;
pub mod config;
pub mod core;
pub mod tracker;
pub mod transparency;

#[cfg(feature = "gateway")]
pub mod gateway;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use channel::{
    ChannelError, ClassifierChannel, InboundMessage, MemorySink, PredictionPayload, QueueChannel,
    RenderSink, StressLevel, TracingSink, WireEncoder, WireEvent,
};
pub use collector::{CollectorError, EventQueue, InputEvent, KeyEvent, PointerEvent};
pub use config::{Config, ConfigError, SourceConfig};
pub use core::{
    FeatureSnapshot, IgnoreReason, RecordOutcome, SessionOptions, SessionState, SharedStressLevel,
    TrackingSession,
};
pub use tracker::Tracker;
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

// Gateway re-exports (when enabled)
#[cfg(feature = "gateway")]
pub use gateway::{GatewayChannel, GatewayClient, GatewayConfig, GatewayError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Declaration of what the agent derives and forwards, for display to users.
pub const SIGNALS_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║             STRESS SIGNAL AGENT - SIGNALS DECLARATION            ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  Derived locally from your input:                                ║
║    • Typing speed (words per minute)                             ║
║    • Backspace ratio (corrections per key press)                 ║
║    • Mouse randomness (how erratic the pointer path is)          ║
║    • Click frequency and click pressure                          ║
║                                                                  ║
║  Forwarded to the stress classifier (when configured):           ║
║    • Each recorded key and pointer event with its timestamp      ║
║                                                                  ║
║  Stress levels reported back:                                    ║
║    Calm · Mild · Moderate · High · Extreme                       ║
║                                                                  ║
║  Nothing is written to disk. Resetting a session discards        ║
║  every buffered event and counter.                               ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_declaration_contents() {
        assert!(SIGNALS_DECLARATION.contains("DECLARATION"));
        assert!(SIGNALS_DECLARATION.contains("Backspace ratio"));
        assert!(SIGNALS_DECLARATION.contains("Nothing is written to disk"));
    }
}
