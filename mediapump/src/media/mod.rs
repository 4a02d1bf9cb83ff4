//! Decode/render collaborator interface
//!
//! The pump drives an extractor/decoder/render-target combination through
//! this capability set and never sees the concrete engine behind it. Slot
//! identifiers index the decoder's buffer pool; presentation times are
//! microseconds of stream time.

use std::time::Duration;

pub mod synthetic;

pub use synthetic::{SessionProbe, SyntheticSession};

/// Index of a decoder buffer slot
pub type SlotId = usize;

/// Result of reading the next sample from the input source into a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRead {
    /// Sample bytes were copied into the slot
    Sample {
        /// Bytes read
        size: usize,
        /// Presentation time of the sample, microseconds
        pts_us: i64,
    },

    /// The input source has no more samples
    EndOfStream,
}

/// Result of polling the decoder's output side
///
/// Only `Output` carries data; the other variants are recognized transient
/// signals the pump logs and rides over, none of them an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPoll {
    /// A decoded unit is ready
    Output {
        slot: SlotId,
        /// Presentation time of the unit, microseconds
        pts_us: i64,
        /// Payload size; zero for pure end-of-stream markers
        size: usize,
        /// The decoder will produce nothing after this unit
        eos: bool,
    },

    /// Nothing decoded yet; the next pump iteration retries naturally
    TryAgain,

    /// The decoder reported a new output format
    FormatChanged,

    /// The decoder replaced its output buffer pool
    BuffersChanged,
}

/// Sync-point selection when repositioning the input source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Nearest sync point at or before the target position
    PreviousSync,

    /// Nearest sync point at or after the target position
    NextSync,

    /// Whichever sync point is closest to the target position
    ClosestSync,
}

/// One playback session's extractor, decoder and render target
///
/// Mutated exclusively by the looper's worker thread, so implementations
/// need no internal locking against the pump. Dropping the session releases
/// whatever resources remain; `stop` halts the decoder first so teardown is
/// orderly.
pub trait MediaSession: Send {
    /// Wait up to `timeout` for a free input slot
    fn dequeue_input_slot(&mut self, timeout: Duration) -> Option<SlotId>;

    /// Copy the input source's current sample into the slot
    fn read_next_sample_into(&mut self, slot: SlotId) -> SampleRead;

    /// Hand the filled slot to the decoder
    fn submit_input(&mut self, slot: SlotId, size: usize, pts_us: i64, end_of_stream: bool);

    /// Advance the input source to its next sample
    fn advance_to_next_sample(&mut self);

    /// Poll for a decoded output unit, waiting at most `timeout`
    fn dequeue_output(&mut self, timeout: Duration) -> OutputPoll;

    /// Return an output slot to the decoder, rendering it if asked
    fn release_output(&mut self, slot: SlotId, render: bool);

    /// Move the input source to a sync point near `pts_us`
    fn reposition(&mut self, pts_us: i64, policy: SyncPolicy);

    /// Discard all buffered decoder state
    fn flush_decoder(&mut self);

    /// Halt the decoder ahead of release
    fn stop(&mut self);
}
