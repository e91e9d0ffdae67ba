//! Outbound classifier transport.

use crate::channel::wire::WireEvent;
use crate::channel::ChannelError;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Fire-and-forget push of wire events toward the classifier.
///
/// Implementations must not block on acknowledgement. Delivery is
/// best-effort and at-most-once; callers never retry a failed send.
pub trait ClassifierChannel: Send {
    fn send(&mut self, event: &WireEvent) -> Result<(), ChannelError>;

    /// Whether sending is currently worthwhile.
    fn is_connected(&self) -> bool {
        true
    }
}

/// In-process channel backed by a bounded crossbeam queue.
///
/// Events are dropped (with [`ChannelError::Full`]) rather than blocking when
/// the consumer falls behind.
#[derive(Debug, Clone)]
pub struct QueueChannel {
    sender: Sender<WireEvent>,
    /// Set once a send finds the receiver gone
    disconnected: bool,
}

impl QueueChannel {
    /// Create the channel and the receiver a transport worker drains.
    pub fn new(capacity: usize) -> (Self, Receiver<WireEvent>) {
        let (sender, receiver) = bounded(capacity);
        (
            Self {
                sender,
                disconnected: false,
            },
            receiver,
        )
    }
}

impl ClassifierChannel for QueueChannel {
    fn send(&mut self, event: &WireEvent) -> Result<(), ChannelError> {
        match self.sender.try_send(event.clone()) {
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
    use crate::channel::wire::WireEncoder;
    use crate::collector::types::KeyEvent;
    use crate::core::session::RecordedEvent;
    use chrono::Utc;

    fn wire_event() -> WireEvent {
        WireEncoder::new(Utc::now()).encode(&RecordedEvent {
            event: KeyEvent::down("a", "KeyA", 0).into(),
            movement_speed: None,
        })
    }

    #[test]
    fn test_queue_channel_delivers() {
        let (mut channel, receiver) = QueueChannel::new(4);
        assert!(channel.is_connected());
        channel.send(&wire_event()).unwrap();
        assert_eq!(receiver.try_recv().unwrap().key.as_deref(), Some("a"));
    }

    #[test]
    fn test_queue_channel_drops_when_full() {
        let (mut channel, _receiver) = QueueChannel::new(1);
        channel.send(&wire_event()).unwrap();
        assert_eq!(channel.send(&wire_event()), Err(ChannelError::Full));
    }

    #[test]
    fn test_queue_channel_disconnected() {
        let (mut channel, receiver) = QueueChannel::new(1);
        drop(receiver);
        assert_eq!(channel.send(&wire_event()), Err(ChannelError::Disconnected));
        assert!(!channel.is_connected());
    }
}
