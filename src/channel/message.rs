//! Inbound classifier messages and the stress level scale.

use crate::channel::ChannelError;
use serde::{Deserialize, Serialize};

/// Ordinal stress scale reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Calm,
    Mild,
    Moderate,
    High,
    Extreme,
}

impl StressLevel {
    pub const ALL: [StressLevel; 5] = [
        StressLevel::Calm,
        StressLevel::Mild,
        StressLevel::Moderate,
        StressLevel::High,
        StressLevel::Extreme,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Display label used by the classifier.
    pub fn label(self) -> &'static str {
        match self {
            StressLevel::Calm => "Calm",
            StressLevel::Mild => "Mild Stress",
            StressLevel::Moderate => "Moderate Stress",
            StressLevel::High => "High Stress",
            StressLevel::Extreme => "Extreme Stress",
        }
    }
}

impl std::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The fields of the `prediction` object the tracker relies on. Everything
/// else (label, probabilities) stays in the raw payload.
#[derive(Debug, Clone, Deserialize)]
struct RawPrediction {
    level_index: i64,
    confidence: f64,
}

/// A validated prediction plus the message exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionPayload {
    pub level: StressLevel,
    pub confidence: f64,
    /// The full inbound message, unmodified
    pub raw: serde_json::Value,
}

/// A parsed message from the classifier channel.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Prediction(PredictionPayload),
    ConnectionEstablished { session_id: Option<String> },
    Error { message: String },
    /// Any other message type; ignored by the tracker
    Other { kind: String },
}

impl InboundMessage {
    /// Parse a JSON text frame.
    pub fn parse(text: &str) -> Result<Self, ChannelError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ChannelError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Interpret an already-decoded JSON message.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ChannelError> {
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| ChannelError::Malformed("missing message type".to_string()))?
            .to_string();

        match kind.as_str() {
            "prediction" => {
                let prediction = value
                    .get("prediction")
                    .cloned()
                    .ok_or_else(|| ChannelError::Malformed("missing prediction".to_string()))?;
                let prediction: RawPrediction = serde_json::from_value(prediction)
                    .map_err(|e| ChannelError::Malformed(e.to_string()))?;

                let level = u8::try_from(prediction.level_index)
                    .ok()
                    .and_then(StressLevel::from_index)
                    .ok_or_else(|| {
                        ChannelError::InvalidPrediction(format!(
                            "level_index {} outside 0..=4",
                            prediction.level_index
                        ))
                    })?;
                if !(0.0..=1.0).contains(&prediction.confidence) {
                    return Err(ChannelError::InvalidPrediction(format!(
                        "confidence {} outside 0..=1",
                        prediction.confidence
                    )));
                }

                Ok(InboundMessage::Prediction(PredictionPayload {
                    level,
                    confidence: prediction.confidence,
                    raw: value,
                }))
            }
            "connection_established" => Ok(InboundMessage::ConnectionEstablished {
                session_id: value
                    .get("session_id")
                    .and_then(|s| s.as_str())
                    .map(str::to_string),
            }),
            "error" => Ok(InboundMessage::Error {
                message: value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
            _ => Ok(InboundMessage::Other { kind }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stress_level_scale() {
        assert_eq!(StressLevel::from_index(0), Some(StressLevel::Calm));
        assert_eq!(StressLevel::from_index(4), Some(StressLevel::Extreme));
        assert_eq!(StressLevel::from_index(5), None);
        assert_eq!(StressLevel::High.index(), 3);
        assert_eq!(StressLevel::Moderate.to_string(), "Moderate Stress");
        assert!(StressLevel::Mild < StressLevel::High);
    }

    #[test]
    fn test_parse_prediction_keeps_raw_payload() {
        let text = r#"{
            "type": "prediction",
            "prediction": {
                "stress_level": "High Stress",
                "level_index": 3,
                "confidence": 0.72,
                "probabilities": {"Calm": 0.1, "High Stress": 0.72}
            },
            "features": {"typing_speed": 64.0}
        }"#;

        match InboundMessage::parse(text).unwrap() {
            InboundMessage::Prediction(payload) => {
                assert_eq!(payload.level, StressLevel::High);
                assert_eq!(payload.confidence, 0.72);
                assert_eq!(payload.raw["features"]["typing_speed"], 64.0);
                assert_eq!(payload.raw["prediction"]["stress_level"], "High Stress");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_reject_out_of_range_prediction() {
        let text = r#"{"type":"prediction","prediction":{"level_index":7,"confidence":0.5}}"#;
        assert!(matches!(
            InboundMessage::parse(text),
            Err(ChannelError::InvalidPrediction(_))
        ));

        let text = r#"{"type":"prediction","prediction":{"level_index":-1,"confidence":0.5}}"#;
        assert!(matches!(
            InboundMessage::parse(text),
            Err(ChannelError::InvalidPrediction(_))
        ));

        let text = r#"{"type":"prediction","prediction":{"level_index":1,"confidence":1.5}}"#;
        assert!(matches!(
            InboundMessage::parse(text),
            Err(ChannelError::InvalidPrediction(_))
        ));
    }

    #[test]
    fn test_malformed_messages() {
        assert!(matches!(
            InboundMessage::parse("not json"),
            Err(ChannelError::Malformed(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"prediction":{}}"#),
            Err(ChannelError::Malformed(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"type":"prediction"}"#),
            Err(ChannelError::Malformed(_))
        ));
    }

    #[test]
    fn test_other_message_types() {
        let message = InboundMessage::parse(
            r#"{"type":"connection_established","session_id":"abc","message":"hi"}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            InboundMessage::ConnectionEstablished {
                session_id: Some("abc".to_string())
            }
        );

        let message = InboundMessage::parse(r#"{"type":"error","message":"Invalid JSON format"}"#)
            .unwrap();
        assert_eq!(
            message,
            InboundMessage::Error {
                message: "Invalid JSON format".to_string()
            }
        );

        let message = InboundMessage::parse(r#"{"type":"app_update","app":{}}"#).unwrap();
        assert_eq!(
            message,
            InboundMessage::Other {
                kind: "app_update".to_string()
            }
        );
    }
}
