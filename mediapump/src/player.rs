//! Pipeline owner and thin command surface
//!
//! The host application holds a [`Player`] and calls these entry points; each
//! one just translates the action into a posted message. The player owns the
//! looper/pump pair outright; there is no process-wide pipeline singleton.

use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::events::EventSink;
use crate::looper::{Looper, LooperHandle};
use crate::media::MediaSession;
use crate::pump::{DecodePump, PumpMessage};

/// One playback session: the looper, its decode pump, and nothing else
pub struct Player {
    looper: Looper<PumpMessage>,
}

impl Player {
    /// Start a pipeline over the given media session
    ///
    /// Comes up primed: the worker renders the opening frame once and then
    /// idles until [`play`](Self::play).
    pub fn start(session: Box<dyn MediaSession>, config: &Config, events: EventSink) -> Result<Self> {
        let pump = DecodePump::new(session, config, events);
        let looper = Looper::spawn("decode-pump", pump);

        // Kick the priming iteration; the one-shot flag stops the chain
        // after the first frame.
        looper.post(PumpMessage::ContinuePumping)?;

        Ok(Self { looper })
    }

    /// Resume playback (no-op while already playing)
    pub fn play(&self) -> Result<()> {
        debug!("player: play");
        self.looper.post(PumpMessage::Resume)
    }

    /// Pause playback (no-op while already paused)
    pub fn pause(&self) -> Result<()> {
        debug!("player: pause");
        self.looper.post(PumpMessage::Pause)
    }

    /// Reposition to the start of the stream; while paused this shows one
    /// fresh frame without resuming
    pub fn rewind(&self) -> Result<()> {
        debug!("player: rewind");
        self.looper.post(PumpMessage::Seek)
    }

    /// Posting handle for callers that want to talk to the pump directly
    pub fn handle(&self) -> LooperHandle<PumpMessage> {
        self.looper.handle()
    }

    /// Tear the pipeline down: release the decoder ahead of any queued work,
    /// then drain and join the worker. Blocks until the worker has exited.
    pub fn shutdown(mut self) {
        info!("player: shutting down");
        // Flush-enqueue so teardown jumps any backlog of pump iterations.
        let _ = self.looper.post_flush(PumpMessage::DecodeDone);
        self.looper.quit();
    }
}
