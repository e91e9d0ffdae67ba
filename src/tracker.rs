//! Tracker: the tracking session wired to its collaborators.
//!
//! The tracker records events into the session, forwards each recorded event
//! to the classifier channel (best effort, at most once), publishes feature
//! snapshots to the render sink, and routes classifier predictions into the
//! stress feedback and on to the sink.
//!
//! All methods take `&mut self`; hosts that deliver events from several
//! threads must serialize access (a mutex, or an [`EventQueue`] drained by one
//! thread).
//!
//! [`EventQueue`]: crate::collector::EventQueue

use crate::channel::{
    ChannelError, ClassifierChannel, InboundMessage, PredictionPayload, RenderSink, WireEncoder,
};
use crate::collector::types::{InputEvent, Modality};
use crate::config::Config;
use crate::core::feedback::SharedStressLevel;
use crate::core::session::{
    RecordOutcome, RecordedEvent, SessionOptions, SessionState, TrackingSession,
};
use crate::core::snapshot::FeatureSnapshot;
use crate::transparency::{create_shared_log, SharedTransparencyLog, TransparencyStats};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A tracking session plus its classifier channel, render sink and feedback.
pub struct Tracker {
    session: TrackingSession,
    channel: Option<Box<dyn ClassifierChannel>>,
    sink: Box<dyn RenderSink>,
    feedback: SharedStressLevel,
    encoder: WireEncoder,
    log: SharedTransparencyLog,
}

impl Tracker {
    /// Create an idle tracker with no classifier channel.
    pub fn new(options: SessionOptions, sink: impl RenderSink + 'static) -> Self {
        let feedback = SharedStressLevel::new();
        let session = TrackingSession::new(options, Arc::new(feedback.clone()));
        let encoder =
            WireEncoder::new(Utc::now()).with_session_id(session.session_id().to_string());

        Self {
            session,
            channel: None,
            sink: Box::new(sink),
            feedback,
            encoder,
            log: create_shared_log(),
        }
    }

    /// Create a tracker using the buffer, source and pressure settings of `config`.
    pub fn from_config(config: &Config, sink: impl RenderSink + 'static) -> Self {
        Self::new(
            SessionOptions {
                buffers: config.buffers,
                sources: config.sources.clone(),
                simulate_pressure: config.simulate_pressure,
                pressure_seed: None,
            },
            sink,
        )
    }

    /// Attach a classifier channel.
    pub fn with_channel(mut self, channel: impl ClassifierChannel + 'static) -> Self {
        self.channel = Some(Box::new(channel));
        self
    }

    /// Set the wall-clock instant that event timestamp 0 corresponds to.
    pub fn with_epoch(mut self, epoch: DateTime<Utc>) -> Self {
        let mut encoder = WireEncoder::new(epoch);
        encoder.set_session_id(self.session.session_id().to_string());
        self.encoder = encoder;
        self
    }

    /// Share an existing transparency log.
    pub fn with_log(mut self, log: SharedTransparencyLog) -> Self {
        self.log = log;
        self
    }

    pub fn start(&mut self) {
        self.session.start();
        self.encoder.set_session_id(self.session.session_id().to_string());
    }

    pub fn pause(&mut self) {
        self.session.pause();
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Record an event and, if it was recorded, forward it to the classifier.
    pub fn record_event(&mut self, event: InputEvent) -> RecordOutcome {
        let outcome = self.session.record_event(event);

        match &outcome {
            RecordOutcome::Recorded(recorded) => {
                match recorded.event.modality() {
                    Modality::Keyboard => self.log.record_keyboard_event(),
                    Modality::Pointer => self.log.record_pointer_event(),
                }
                self.forward(recorded);
            }
            RecordOutcome::Ignored(reason) => {
                tracing::trace!(?reason, "Event ignored");
                self.log.record_ignored_event();
            }
        }

        outcome
    }

    fn forward(&mut self, recorded: &RecordedEvent) {
        let channel = match self.channel.as_mut() {
            Some(channel) => channel,
            None => return,
        };

        if !channel.is_connected() {
            self.log.record_forward_failure();
            return;
        }

        let wire = self.encoder.encode(recorded);
        match channel.send(&wire) {
            Ok(()) => self.log.record_forwarded_event(),
            Err(e) => {
                tracing::warn!("Failed to forward event to classifier: {e}");
                self.log.record_forward_failure();
            }
        }
    }

    /// Current features, without publishing.
    pub fn snapshot(&self) -> FeatureSnapshot {
        self.session.snapshot()
    }

    /// Assemble a snapshot and hand it to the render sink.
    pub fn publish_snapshot(&mut self) -> FeatureSnapshot {
        let snapshot = self.session.snapshot();
        self.sink.on_snapshot(&snapshot);
        self.log.record_snapshot_published();
        snapshot
    }

    /// Handle one text message from the classifier channel.
    ///
    /// Malformed or invalid messages are logged and returned as errors; they
    /// never disturb the session.
    pub fn handle_message(&mut self, text: &str) -> Result<InboundMessage, ChannelError> {
        let message = InboundMessage::parse(text).map_err(|e| {
            tracing::warn!("Rejected classifier message: {e}");
            e
        })?;

        match &message {
            InboundMessage::Prediction(payload) => self.handle_prediction(payload),
            InboundMessage::ConnectionEstablished { session_id } => {
                tracing::info!(remote_session = ?session_id, "Classifier connected");
            }
            InboundMessage::Error { message } => {
                tracing::warn!("Classifier reported an error: {message}");
            }
            InboundMessage::Other { kind } => {
                tracing::debug!(kind = %kind, "Ignoring classifier message");
            }
        }

        Ok(message)
    }

    /// Record the prediction's level as stress feedback and forward it to the sink.
    pub fn handle_prediction(&mut self, payload: &PredictionPayload) {
        self.feedback.set(payload.level.index());
        self.log.record_prediction();
        self.sink.on_prediction(payload);
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    /// Handle to the stress feedback cell read by pressure simulation.
    pub fn feedback(&self) -> SharedStressLevel {
        self.feedback.clone()
    }

    pub fn log(&self) -> SharedTransparencyLog {
        self.log.clone()
    }

    pub fn stats(&self) -> TransparencyStats {
        self.log.stats()
    }

    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }
}
