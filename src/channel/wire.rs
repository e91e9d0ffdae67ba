//! Outbound wire schema for the remote classifier.
//!
//! A flat object per event: `type` ("keyboard" | "mouse"), `eventType`, the
//! key or coordinate fields that apply, an ISO-8601 `timestamp`, and extras
//! (`pressure`, `movementSpeed`, `deltaX`/`deltaY`).

use crate::collector::types::{InputEvent, KeyKind, PointerEvent};
use crate::core::session::RecordedEvent;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Wire `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireModality {
    Keyboard,
    Mouse,
}

/// Wire `eventType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireEventType {
    Keydown,
    Keyup,
    Move,
    Click,
    Release,
    Scroll,
}

/// One event as sent to the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub modality: WireModality,
    pub event_type: WireEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_y: Option<f64>,
    /// RFC 3339 / ISO-8601, UTC, millisecond precision
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl WireEvent {
    fn blank(modality: WireModality, event_type: WireEventType, timestamp: String) -> Self {
        Self {
            modality,
            event_type,
            key: None,
            code: None,
            x: None,
            y: None,
            button: None,
            pressure: None,
            movement_speed: None,
            delta_x: None,
            delta_y: None,
            timestamp,
            session_id: None,
        }
    }
}

/// Maps monotonic event timestamps onto wall-clock time for the wire.
#[derive(Debug, Clone)]
pub struct WireEncoder {
    epoch: DateTime<Utc>,
    session_id: Option<String>,
}

impl WireEncoder {
    /// `epoch` is the wall-clock instant that monotonic time 0 corresponds to.
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Wall-clock timestamp for a monotonic offset.
    pub fn timestamp(&self, timestamp_ms: u64) -> String {
        let offset = Duration::milliseconds(i64::try_from(timestamp_ms).unwrap_or(i64::MAX));
        self.epoch
            .checked_add_signed(offset)
            .unwrap_or(self.epoch)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Encode a recorded event.
    pub fn encode(&self, recorded: &RecordedEvent) -> WireEvent {
        let timestamp = self.timestamp(recorded.event.timestamp_ms());

        let mut wire = match &recorded.event {
            InputEvent::Key(key) => {
                let event_type = match key.kind {
                    KeyKind::Down => WireEventType::Keydown,
                    KeyKind::Up => WireEventType::Keyup,
                };
                let mut wire = WireEvent::blank(WireModality::Keyboard, event_type, timestamp);
                wire.key = Some(key.key.clone());
                wire.code = Some(key.code.clone());
                wire
            }
            InputEvent::Pointer(pointer) => {
                let event_type = match pointer {
                    PointerEvent::Move { .. } => WireEventType::Move,
                    PointerEvent::Click { .. } => WireEventType::Click,
                    PointerEvent::Release { .. } => WireEventType::Release,
                    PointerEvent::Scroll { .. } => WireEventType::Scroll,
                };
                let mut wire = WireEvent::blank(WireModality::Mouse, event_type, timestamp);
                if let Some((x, y)) = pointer.position() {
                    wire.x = Some(x);
                    wire.y = Some(y);
                }
                match pointer {
                    PointerEvent::Click {
                        button, pressure, ..
                    } => {
                        wire.button = Some(*button);
                        wire.pressure = *pressure;
                    }
                    PointerEvent::Release { button, .. } => {
                        wire.button = Some(*button);
                    }
                    PointerEvent::Scroll {
                        delta_x, delta_y, ..
                    } => {
                        wire.delta_x = Some(*delta_x);
                        wire.delta_y = Some(*delta_y);
                    }
                    PointerEvent::Move { .. } => {
                        wire.movement_speed = recorded.movement_speed;
                    }
                }
                wire
            }
        };

        wire.session_id = self.session_id.clone();
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::KeyEvent;
    use chrono::TimeZone;

    fn encoder() -> WireEncoder {
        WireEncoder::new(Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_keyboard_wire_shape() {
        let recorded = RecordedEvent {
            event: KeyEvent::down("a", "KeyA", 1500).into(),
            movement_speed: None,
        };
        let value = serde_json::to_value(encoder().encode(&recorded)).unwrap();

        assert_eq!(value["type"], "keyboard");
        assert_eq!(value["eventType"], "keydown");
        assert_eq!(value["key"], "a");
        assert_eq!(value["code"], "KeyA");
        assert_eq!(value["timestamp"], "2024-01-22T10:00:01.500Z");
        assert!(value.get("x").is_none());
        assert!(value.get("sessionId").is_none());
    }

    #[test]
    fn test_move_carries_speed() {
        let recorded = RecordedEvent {
            event: PointerEvent::movement(3.0, 4.0, 10).into(),
            movement_speed: Some(0.5),
        };
        let wire = encoder().with_session_id("s-1").encode(&recorded);

        assert_eq!(wire.modality, WireModality::Mouse);
        assert_eq!(wire.event_type, WireEventType::Move);
        assert_eq!(wire.x, Some(3.0));
        assert_eq!(wire.movement_speed, Some(0.5));
        assert_eq!(wire.session_id.as_deref(), Some("s-1"));

        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value["movementSpeed"], 0.5);
        assert_eq!(value["sessionId"], "s-1");
    }

    #[test]
    fn test_click_and_scroll_extras() {
        let click = RecordedEvent {
            event: PointerEvent::Click {
                x: 1.0,
                y: 2.0,
                button: 2,
                pressure: Some(0.85),
                timestamp_ms: 0,
            }
            .into(),
            movement_speed: None,
        };
        let wire = encoder().encode(&click);
        assert_eq!(wire.event_type, WireEventType::Click);
        assert_eq!(wire.button, Some(2));
        assert_eq!(wire.pressure, Some(0.85));

        let scroll = RecordedEvent {
            event: PointerEvent::scroll(0.0, -120.0, 0).into(),
            movement_speed: None,
        };
        let value = serde_json::to_value(encoder().encode(&scroll)).unwrap();
        assert_eq!(value["eventType"], "scroll");
        assert_eq!(value["deltaY"], -120.0);
        assert!(value.get("x").is_none());
    }
}
