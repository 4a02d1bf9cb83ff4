//! Scripted in-memory media session
//!
//! Emulates an extractor plus decoder over a fixed run of frames: a small
//! input slot pool, a short warm-up of try-again polls after each flush, a
//! one-time format report, and an end-of-stream marker unit once the last
//! input drains through. The demo binary plays it; tests script it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::media::{MediaSession, OutputPoll, SampleRead, SlotId, SyncPolicy};

/// Size reported for every synthetic sample
const FRAME_SIZE: usize = 4 * 1024;

/// Input slots the synthetic decoder exposes
const SLOT_COUNT: usize = 4;

/// Shared counters a test can read after the session moved into the pump
#[derive(Clone, Default)]
pub struct SessionProbe {
    inner: Arc<ProbeInner>,
}

#[derive(Default)]
struct ProbeInner {
    rendered: AtomicU32,
    released_unrendered: AtomicU32,
    repositions: AtomicU32,
    flushes: AtomicU32,
    stopped: AtomicBool,
}

impl SessionProbe {
    /// Output units released with render=true
    pub fn rendered(&self) -> u32 {
        self.inner.rendered.load(Ordering::Acquire)
    }

    /// Output units released without rendering (end-of-stream markers)
    pub fn released_unrendered(&self) -> u32 {
        self.inner.released_unrendered.load(Ordering::Acquire)
    }

    pub fn repositions(&self) -> u32 {
        self.inner.repositions.load(Ordering::Acquire)
    }

    pub fn flushes(&self) -> u32 {
        self.inner.flushes.load(Ordering::Acquire)
    }

    pub fn stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }
}

/// An input the decoder has accepted but not yet surfaced as output
struct QueuedInput {
    slot: SlotId,
    pts_us: i64,
    size: usize,
    eos: bool,
}

/// Fixed-length frame stream behind the [`MediaSession`] interface
pub struct SyntheticSession {
    total_frames: u32,
    frame_interval_us: i64,
    warmup_polls: u32,

    /// Input cursor: next frame the "extractor" will read
    next_input_frame: u32,
    /// Inputs inside the "decoder", surfaced as outputs in order
    in_flight: VecDeque<QueuedInput>,
    /// Try-again polls remaining before the next output
    polls_until_output: u32,
    format_reported: bool,
    stopped: bool,

    probe: SessionProbe,
}

impl SyntheticSession {
    pub fn new(total_frames: u32, frame_interval_us: i64) -> Self {
        Self {
            total_frames,
            frame_interval_us,
            warmup_polls: 0,
            next_input_frame: 0,
            in_flight: VecDeque::new(),
            polls_until_output: 0,
            format_reported: false,
            stopped: false,
            probe: SessionProbe::default(),
        }
    }

    /// Stream shaped by the demo settings in `config`
    pub fn from_config(config: &Config) -> Self {
        let mut session = Self::new(config.demo_frames, config.demo_frame_interval_us);
        session.warmup_polls = config.demo_warmup_polls;
        session.polls_until_output = config.demo_warmup_polls;
        session
    }

    /// Counters that stay readable after the session moves into the pump
    pub fn probe(&self) -> SessionProbe {
        self.probe.clone()
    }

    fn pts_of(&self, frame: u32) -> i64 {
        frame as i64 * self.frame_interval_us
    }
}

impl MediaSession for SyntheticSession {
    fn dequeue_input_slot(&mut self, timeout: Duration) -> Option<SlotId> {
        if self.stopped {
            return None;
        }
        if self.in_flight.len() >= SLOT_COUNT {
            // Pool exhausted: behave like a codec and block out the timeout.
            thread::sleep(timeout);
            return None;
        }
        Some(self.in_flight.len())
    }

    fn read_next_sample_into(&mut self, _slot: SlotId) -> SampleRead {
        if self.next_input_frame >= self.total_frames {
            return SampleRead::EndOfStream;
        }
        SampleRead::Sample {
            size: FRAME_SIZE,
            pts_us: self.pts_of(self.next_input_frame),
        }
    }

    fn submit_input(&mut self, slot: SlotId, size: usize, pts_us: i64, end_of_stream: bool) {
        self.in_flight.push_back(QueuedInput {
            slot,
            pts_us,
            size,
            eos: end_of_stream,
        });
    }

    fn advance_to_next_sample(&mut self) {
        if self.next_input_frame < self.total_frames {
            self.next_input_frame += 1;
        }
    }

    fn dequeue_output(&mut self, _timeout: Duration) -> OutputPoll {
        if self.in_flight.is_empty() {
            return OutputPoll::TryAgain;
        }
        if !self.format_reported {
            self.format_reported = true;
            return OutputPoll::FormatChanged;
        }
        if self.polls_until_output > 0 {
            self.polls_until_output -= 1;
            return OutputPoll::TryAgain;
        }

        let input = self.in_flight.pop_front().expect("checked non-empty");
        OutputPoll::Output {
            slot: input.slot,
            pts_us: input.pts_us,
            size: input.size,
            eos: input.eos,
        }
    }

    fn release_output(&mut self, _slot: SlotId, render: bool) {
        if render {
            self.probe.inner.rendered.fetch_add(1, Ordering::AcqRel);
        } else {
            self.probe
                .inner
                .released_unrendered
                .fetch_add(1, Ordering::AcqRel);
        }
    }

    fn reposition(&mut self, pts_us: i64, policy: SyncPolicy) {
        // Every frame is a sync point here, so PreviousSync floors.
        let frame = if self.frame_interval_us > 0 {
            (pts_us.max(0) / self.frame_interval_us) as u32
        } else {
            0
        };
        debug!(
            "synthetic reposition to frame {} (pts={}us, policy={:?})",
            frame, pts_us, policy
        );
        self.next_input_frame = frame.min(self.total_frames);
        self.probe.inner.repositions.fetch_add(1, Ordering::AcqRel);
    }

    fn flush_decoder(&mut self) {
        self.in_flight.clear();
        self.polls_until_output = self.warmup_polls;
        self.probe.inner.flushes.fetch_add(1, Ordering::AcqRel);
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.probe.inner.stopped.store(true, Ordering::Release);
    }
}
