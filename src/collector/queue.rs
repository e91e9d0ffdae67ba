//! Bounded event queue serializing concurrent input delivery.
//!
//! Producers on any thread push events through cloned [`EventSender`]s; a
//! single consumer drains them into the tracking session in arrival order.

use crate::collector::types::InputEvent;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;
use thiserror::Error;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Errors that can occur while delivering events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectorError {
    #[error("Event queue is full")]
    QueueFull,
    #[error("Event queue is disconnected")]
    Disconnected,
    #[error("Timed out waiting for an event")]
    Timeout,
}

/// Producer handle for an [`EventQueue`].
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: Sender<InputEvent>,
}

impl EventSender {
    /// Push an event without blocking.
    pub fn try_send(&self, event: InputEvent) -> Result<(), CollectorError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => CollectorError::QueueFull,
            TrySendError::Disconnected(_) => CollectorError::Disconnected,
        })
    }

    /// Push an event, waiting for room if the queue is full.
    pub fn send(&self, event: InputEvent) -> Result<(), CollectorError> {
        self.sender
            .send(event)
            .map_err(|_| CollectorError::Disconnected)
    }
}

/// Single-consumer side of the event queue.
pub struct EventQueue {
    sender: Option<Sender<InputEvent>>,
    receiver: Receiver<InputEvent>,
}

impl EventQueue {
    /// Create a queue holding at most `capacity` undelivered events.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender: Some(sender),
            receiver,
        }
    }

    /// Get a new producer handle.
    ///
    /// Returns `None` once [`EventQueue::close`] has been called.
    pub fn sender(&self) -> Option<EventSender> {
        self.sender.as_ref().map(|sender| EventSender {
            sender: sender.clone(),
        })
    }

    /// Drop the queue's own sender so the queue disconnects when the last
    /// producer goes away.
    pub fn close(&mut self) {
        self.sender = None;
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<InputEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, CollectorError> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => CollectorError::Timeout,
            RecvTimeoutError::Disconnected => CollectorError::Disconnected,
        })
    }

    /// Drain every queued event, in arrival order.
    pub fn drain(&self) -> Vec<InputEvent> {
        self.receiver.try_iter().collect()
    }

    /// Number of events waiting.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
