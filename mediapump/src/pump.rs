//! Decode pump state machine
//!
//! A [`Handler`] that turns the looper's one-shot message dispatch into a
//! continuous decode/render pipeline: each `ContinuePumping` message moves at
//! most one input unit into the decoder and at most one output unit out to
//! the render target, then re-posts itself while either side of the stream
//! still has work. Control commands interleave with that stream on the same
//! queue, so the pump never needs a lock of its own.
//!
//! Reachable states, expressed through the flag combinations in
//! [`PlaybackState`]:
//!
//! - **Priming**: fresh pipeline, not playing, one-shot render armed; the
//!   first pump iteration shows a single frame and goes idle.
//! - **Pumping**: playing, pump re-posting itself while input or output
//!   remains.
//! - **Paused**: not playing, no outstanding self-post (pause flushes it).
//! - **Seeking** (transient): exhaustion flags and render anchor cleared,
//!   then back to Pumping or to a one-shot render depending on `playing`.
//! - **Done**: both sides exhausted, no further self-post.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::events::{EventSink, PumpEvent};
use crate::looper::{Handler, LooperHandle};
use crate::media::{MediaSession, OutputPoll, SampleRead, SyncPolicy};
use crate::timing::RenderClock;

/// Message kinds driving the pump
///
/// Callers use the named kinds only; the ordinal values are private to this
/// module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpMessage {
    /// One decode/render iteration; re-posts itself while work remains
    ContinuePumping,

    /// Stop playing and flush queued pump work
    Pause,

    /// Start playing and restart the self-sustaining loop
    Resume,

    /// Emitted by the pause handler as the flush payload; carries no action
    PauseAck,

    /// Halt the decoder and release its resources
    DecodeDone,

    /// Reposition the stream to its start
    Seek,
}

/// Per-session pipeline state, mutated only on the worker thread
///
/// The extractor, decoder and render target live behind the `session` trait
/// object; taking it out and dropping it is what releases them.
pub struct PlaybackState {
    pub(crate) session: Option<Box<dyn MediaSession>>,
    pub(crate) render_clock: RenderClock,
    pub(crate) saw_input_eos: bool,
    pub(crate) saw_output_eos: bool,
    pub(crate) playing: bool,
    pub(crate) render_once: bool,
}

/// The pump: a [`Handler`] over [`PumpMessage`]
pub struct DecodePump {
    session_id: Uuid,
    pub(crate) state: PlaybackState,
    events: EventSink,
    input_timeout: Duration,
    eos_reported: bool,
}

impl DecodePump {
    /// New pipeline in the Priming state: not playing, one-shot render armed.
    /// The owner posts the first `ContinuePumping` to show the opening frame.
    pub fn new(session: Box<dyn MediaSession>, config: &Config, events: EventSink) -> Self {
        let session_id = Uuid::new_v4();
        info!("decode pump created (session={})", session_id);

        Self {
            session_id,
            state: PlaybackState {
                session: Some(session),
                render_clock: RenderClock::new(),
                saw_input_eos: false,
                saw_output_eos: false,
                playing: false,
                render_once: true,
            },
            events,
            input_timeout: config.input_timeout(),
            eos_reported: false,
        }
    }

    /// One pump iteration: feed at most one input, drain at most one output,
    /// then reschedule while either side has work left
    fn pump_once(&mut self, looper: &LooperHandle<PumpMessage>) {
        let state = &mut self.state;
        let Some(session) = state.session.as_mut() else {
            debug!(
                "pump iteration after decoder release, dropping (session={})",
                self.session_id
            );
            return;
        };

        if !state.saw_input_eos {
            match session.dequeue_input_slot(self.input_timeout) {
                Some(slot) => {
                    let (size, pts_us) = match session.read_next_sample_into(slot) {
                        SampleRead::Sample { size, pts_us } => (size, pts_us),
                        SampleRead::EndOfStream => {
                            info!("input end of stream (session={})", self.session_id);
                            state.saw_input_eos = true;
                            (0, 0)
                        }
                    };
                    session.submit_input(slot, size, pts_us, state.saw_input_eos);
                    session.advance_to_next_sample();
                }
                None => trace!("no input slot available (session={})", self.session_id),
            }
        }

        if !state.saw_output_eos {
            match session.dequeue_output(Duration::ZERO) {
                OutputPoll::Output {
                    slot,
                    pts_us,
                    size,
                    eos,
                } => {
                    if eos {
                        info!("output end of stream (session={})", self.session_id);
                        state.saw_output_eos = true;
                    }

                    // Hold the unit until its presentation time comes due,
                    // then hand it to the render target.
                    let delay = state.render_clock.delay_for(pts_us);
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    session.release_output(slot, size > 0);
                    if size > 0 {
                        self.events.emit(PumpEvent::FrameRendered { pts_us });
                    }

                    if state.render_once {
                        state.render_once = false;
                        debug!("one-shot render complete (session={})", self.session_id);
                        return;
                    }
                }
                OutputPoll::TryAgain => {
                    trace!("no output buffer right now (session={})", self.session_id)
                }
                OutputPoll::FormatChanged => {
                    info!("output format changed (session={})", self.session_id)
                }
                OutputPoll::BuffersChanged => {
                    debug!("output buffers changed (session={})", self.session_id)
                }
            }
        }

        if !state.saw_input_eos || !state.saw_output_eos {
            if let Err(e) = looper.post(PumpMessage::ContinuePumping) {
                warn!(
                    "failed to reschedule pump, pipeline stalls (session={}): {}",
                    self.session_id, e
                );
            }
        } else if !self.eos_reported {
            self.eos_reported = true;
            info!("pipeline drained (session={})", self.session_id);
            self.events.emit(PumpEvent::EndOfStream);
        }
    }

    fn on_pause(&mut self, looper: &LooperHandle<PumpMessage>) {
        if !self.state.playing {
            debug!("pause ignored, not playing (session={})", self.session_id);
            return;
        }
        self.state.playing = false;

        // Flush-enqueue the acknowledgement: any pump iterations already
        // queued behind this command are discarded, so the pipeline goes
        // fully idle instead of decoding into a paused stream.
        if let Err(e) = looper.post_flush(PumpMessage::PauseAck) {
            warn!(
                "failed to post pause acknowledgement (session={}): {}",
                self.session_id, e
            );
        }

        info!("paused (session={})", self.session_id);
        self.events.emit(PumpEvent::Paused);
    }

    fn on_resume(&mut self, looper: &LooperHandle<PumpMessage>) {
        if self.state.playing {
            debug!(
                "resume ignored, already playing (session={})",
                self.session_id
            );
            return;
        }

        // Re-anchor on the next output rather than racing to catch up to
        // where the stream left off.
        self.state.render_clock.reset();
        self.state.playing = true;

        if let Err(e) = looper.post(PumpMessage::ContinuePumping) {
            warn!(
                "failed to restart pump (session={}): {}",
                self.session_id, e
            );
        }

        info!("resumed (session={})", self.session_id);
        self.events.emit(PumpEvent::Resumed);
    }

    fn on_seek(&mut self, looper: &LooperHandle<PumpMessage>) {
        let was_done = self.state.saw_input_eos && self.state.saw_output_eos;

        let Some(session) = self.state.session.as_mut() else {
            debug!(
                "seek after decoder release, dropping (session={})",
                self.session_id
            );
            return;
        };

        session.reposition(0, SyncPolicy::PreviousSync);
        session.flush_decoder();

        self.state.render_clock.reset();
        self.state.saw_input_eos = false;
        self.state.saw_output_eos = false;
        self.eos_reported = false;

        if !self.state.playing {
            // Show one fresh frame at the new position without resuming.
            self.state.render_once = true;
            if let Err(e) = looper.post(PumpMessage::ContinuePumping) {
                warn!(
                    "failed to schedule one-shot render (session={}): {}",
                    self.session_id, e
                );
            }
        } else if was_done {
            // The self-post chain died at end of stream; playing again from
            // the top needs a fresh kick.
            if let Err(e) = looper.post(PumpMessage::ContinuePumping) {
                warn!(
                    "failed to restart pump after seek (session={}): {}",
                    self.session_id, e
                );
            }
        }

        info!("seeked to start (session={})", self.session_id);
        self.events.emit(PumpEvent::Seeked { pts_us: 0 });
    }

    fn on_decode_done(&mut self) {
        if let Some(mut session) = self.state.session.take() {
            session.stop();
            info!(
                "decoder stopped, resources released (session={})",
                self.session_id
            );
        } else {
            debug!(
                "decode-done with no active decoder (session={})",
                self.session_id
            );
        }

        // Terminal: no further self-post can happen.
        self.state.saw_input_eos = true;
        self.state.saw_output_eos = true;
        self.events.emit(PumpEvent::Stopped);
    }
}

impl Handler for DecodePump {
    type Message = PumpMessage;

    fn handle(&mut self, looper: &LooperHandle<PumpMessage>, msg: PumpMessage) {
        match msg {
            PumpMessage::ContinuePumping => self.pump_once(looper),
            PumpMessage::Pause => self.on_pause(looper),
            PumpMessage::Resume => self.on_resume(looper),
            PumpMessage::Seek => self.on_seek(looper),
            PumpMessage::DecodeDone => self.on_decode_done(),
            other => debug!("dropping message {:?} (session={})", other, self.session_id),
        }
    }
}
