//! Pump observability events
//!
//! One-to-one channel from the pump's worker thread to whoever owns the
//! pipeline. Emission is best-effort and never blocks the worker: events are
//! diagnostics, not control flow, and a dropped receiver is not an error.

use std::sync::mpsc;

use tracing::trace;

/// Events emitted by the decode pump as it works through a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpEvent {
    /// An output unit was released for rendering
    FrameRendered {
        /// Presentation time of the rendered unit, microseconds
        pts_us: i64,
    },

    /// Playback paused; queued pump work was flushed
    Paused,

    /// Playback resumed; the render anchor will be re-established
    Resumed,

    /// The input source was repositioned
    Seeked {
        /// Target presentation time, microseconds
        pts_us: i64,
    },

    /// Both input and output sides of the stream are exhausted
    EndOfStream,

    /// Decoder halted and resources released
    Stopped,
}

/// Best-effort event emitter held by the pump
pub struct EventSink {
    tx: Option<mpsc::Sender<PumpEvent>>,
}

impl EventSink {
    /// Sink that forwards events to the given channel
    pub fn new(tx: mpsc::Sender<PumpEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sink that discards every event
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Emit an event. Never blocks; a closed channel is logged and ignored.
    pub fn emit(&self, event: PumpEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                trace!("event receiver dropped, discarding event");
            }
        }
    }
}
