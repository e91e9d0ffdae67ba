//! Bounded, append-only event buffer.
//!
//! One buffer holds the raw events of a single modality. The buffer is the
//! window that pattern features are computed over; running totals live on the
//! extractors and survive eviction.

use crate::collector::types::Timestamped;
use std::collections::vec_deque;
use std::collections::VecDeque;

/// Append-only event store with optional FIFO capacity bound.
#[derive(Debug, Clone)]
pub struct EventBuffer<E> {
    events: VecDeque<E>,
    /// `None` means unbounded
    max_events: Option<usize>,
    /// Events dropped from the head since the last clear
    evicted: u64,
}

impl<E: Timestamped> EventBuffer<E> {
    /// Create a buffer holding at most `max_events` events (`None` = unbounded).
    pub fn new(max_events: Option<usize>) -> Self {
        Self {
            events: VecDeque::new(),
            max_events,
            evicted: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn bounded(max_events: usize) -> Self {
        Self::new(Some(max_events))
    }

    /// Add an event at the tail, evicting from the head while over capacity.
    ///
    /// Returns the number of events evicted.
    pub fn append(&mut self, event: E) -> usize {
        self.events.push_back(event);

        let mut evicted = 0;
        if let Some(max) = self.max_events {
            while self.events.len() > max {
                self.events.pop_front();
                evicted += 1;
            }
        }
        self.evicted += evicted as u64;
        evicted
    }

    /// Drop all events.
    pub fn clear(&mut self) {
        self.events.clear();
        self.evicted = 0;
    }

    /// Read-only view of the buffered events, oldest first.
    pub fn snapshot(&self) -> vec_deque::Iter<'_, E> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn max_events(&self) -> Option<usize> {
        self.max_events
    }

    /// Events dropped from the head since the last clear.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn first(&self) -> Option<&E> {
        self.events.front()
    }

    pub fn last(&self) -> Option<&E> {
        self.events.back()
    }

    /// Timestamp of the newest event, if any.
    pub fn latest_timestamp_ms(&self) -> Option<u64> {
        self.events.back().map(Timestamped::timestamp_ms)
    }
}

impl<E: Timestamped> Default for EventBuffer<E> {
    fn default() -> Self {
        Self::unbounded()
    }
}
