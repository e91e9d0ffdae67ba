//! Inbound input events.
//!
//! This module defines the raw keyboard and pointer event types and the
//! queue used to hand events from capture threads to the tracking session.

pub mod queue;
pub mod types;

// Re-export commonly used types
pub use queue::{CollectorError, EventQueue, EventSender, DEFAULT_QUEUE_CAPACITY};
pub use types::{InputEvent, KeyEvent, KeyKind, Modality, PointerEvent, Timestamped};
