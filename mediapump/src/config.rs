//! Runtime configuration for the decode pump
//!
//! Loaded from a TOML file when one is given, otherwise compiled defaults.
//! Every field has a default so a partial file is fine.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pump and demo-stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bounded wait for a decoder input slot on each pump iteration, in
    /// microseconds. Matches the dequeue timeout a hardware codec would get.
    pub input_timeout_us: u64,

    /// Total frames the synthetic demo stream produces
    pub demo_frames: u32,

    /// Presentation-time spacing between demo frames, in microseconds
    pub demo_frame_interval_us: i64,

    /// Number of empty output polls the synthetic decoder answers with
    /// try-again before its first output after a flush (decoder warm-up)
    pub demo_warmup_polls: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_timeout_us: 2_000,
            demo_frames: 120,
            demo_frame_interval_us: 33_333,
            demo_warmup_polls: 2,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Input-slot dequeue timeout as a Duration
    pub fn input_timeout(&self) -> Duration {
        Duration::from_micros(self.input_timeout_us)
    }
}
