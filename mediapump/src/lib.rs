//! # mediapump
//!
//! A single-worker message loop ("looper") plus the decoder-pump state
//! machine built on top of it, driving a streaming decode/render pipeline
//! without blocking the caller's thread.
//!
//! **Architecture:** any number of threads post commands to the looper's
//! FIFO queue; one worker thread dequeues them in order and hands each to
//! the pump, which keeps the pipeline alive by re-posting its own
//! continue-pumping message while the stream has work left. Pause, resume,
//! seek and stop interleave with that stream on the same queue, so all
//! pipeline state is mutated from exactly one thread.

pub mod config;
pub mod error;
pub mod events;
pub mod looper;
pub mod media;
pub mod player;
pub mod pump;
pub mod timing;

pub use config::Config;
pub use error::{Error, Result};
pub use events::{EventSink, PumpEvent};
pub use looper::{Handler, Looper, LooperHandle};
pub use player::Player;
pub use pump::{DecodePump, PumpMessage};
