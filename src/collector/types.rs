//! Raw input event types.
//!
//! Timestamps are monotonic milliseconds since the session (or process)
//! started. Wall-clock time is only attached when an event leaves the process.

use serde::{Deserialize, Serialize};

/// Which input device an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Keyboard,
    Pointer,
}

/// Key transition direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Down,
    Up,
}

/// A keyboard event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Logical key value (e.g. "a", "Backspace")
    pub key: String,
    /// Physical key code (e.g. "KeyA")
    pub code: String,
    /// Press or release
    pub kind: KeyKind,
    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl KeyEvent {
    pub fn down(key: impl Into<String>, code: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            kind: KeyKind::Down,
            timestamp_ms,
        }
    }

    pub fn up(key: impl Into<String>, code: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            kind: KeyKind::Up,
            timestamp_ms,
        }
    }

    pub fn is_down(&self) -> bool {
        self.kind == KeyKind::Down
    }

    /// Whether this key erases text (Backspace or Delete).
    pub fn is_correction(&self) -> bool {
        self.key == "Backspace" || self.key == "Delete"
    }
}

/// A pointer event.
///
/// `button` is the DOM-style button index (0 = primary, 1 = middle, 2 = secondary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    Move {
        x: f64,
        y: f64,
        timestamp_ms: u64,
    },
    Click {
        x: f64,
        y: f64,
        button: u8,
        /// Contact pressure (0-1). Absent on devices without pressure sensing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pressure: Option<f64>,
        timestamp_ms: u64,
    },
    Release {
        x: f64,
        y: f64,
        button: u8,
        timestamp_ms: u64,
    },
    Scroll {
        delta_x: f64,
        delta_y: f64,
        timestamp_ms: u64,
    },
}

impl PointerEvent {
    pub fn movement(x: f64, y: f64, timestamp_ms: u64) -> Self {
        PointerEvent::Move { x, y, timestamp_ms }
    }

    pub fn click(x: f64, y: f64, button: u8, timestamp_ms: u64) -> Self {
        PointerEvent::Click {
            x,
            y,
            button,
            pressure: None,
            timestamp_ms,
        }
    }

    pub fn release(x: f64, y: f64, button: u8, timestamp_ms: u64) -> Self {
        PointerEvent::Release {
            x,
            y,
            button,
            timestamp_ms,
        }
    }

    pub fn scroll(delta_x: f64, delta_y: f64, timestamp_ms: u64) -> Self {
        PointerEvent::Scroll {
            delta_x,
            delta_y,
            timestamp_ms,
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            PointerEvent::Move { timestamp_ms, .. }
            | PointerEvent::Click { timestamp_ms, .. }
            | PointerEvent::Release { timestamp_ms, .. }
            | PointerEvent::Scroll { timestamp_ms, .. } => *timestamp_ms,
        }
    }

    /// Cursor position, for the variants that carry one.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            PointerEvent::Move { x, y, .. }
            | PointerEvent::Click { x, y, .. }
            | PointerEvent::Release { x, y, .. } => Some((*x, *y)),
            PointerEvent::Scroll { .. } => None,
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, PointerEvent::Move { .. })
    }

    pub fn is_click(&self) -> bool {
        matches!(self, PointerEvent::Click { .. })
    }
}

/// Unified input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "modality", rename_all = "snake_case")]
pub enum InputEvent {
    Key(KeyEvent),
    Pointer(PointerEvent),
}

impl InputEvent {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            InputEvent::Key(e) => e.timestamp_ms,
            InputEvent::Pointer(e) => e.timestamp_ms(),
        }
    }

    pub fn modality(&self) -> Modality {
        match self {
            InputEvent::Key(_) => Modality::Keyboard,
            InputEvent::Pointer(_) => Modality::Pointer,
        }
    }
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        InputEvent::Key(event)
    }
}

impl From<PointerEvent> for InputEvent {
    fn from(event: PointerEvent) -> Self {
        InputEvent::Pointer(event)
    }
}

/// Anything stored in an event buffer must expose its timestamp.
pub trait Timestamped {
    fn timestamp_ms(&self) -> u64;
}

impl Timestamped for KeyEvent {
    fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

impl Timestamped for PointerEvent {
    fn timestamp_ms(&self) -> u64 {
        PointerEvent::timestamp_ms(self)
    }
}

impl Timestamped for InputEvent {
    fn timestamp_ms(&self) -> u64 {
        InputEvent::timestamp_ms(self)
    }
}
