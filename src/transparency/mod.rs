//! Transparency module.
//!
//! Tracks and exposes what the tracker recorded, dropped and forwarded.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, SharedTransparencyLog, TransparencyLog, TransparencyStats};
