//! Error types for mediapump
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. The worker thread recovers every internal condition locally;
//! the only errors that cross the public boundary are refusals to accept new
//! work after shutdown and configuration problems in the binary path.

use thiserror::Error;

/// Main error type for mediapump
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Posting to a looper whose quit has started or completed
    #[error("Looper has shut down, message rejected")]
    LooperStopped,

    /// Media session setup errors
    #[error("Media session error: {0}")]
    Media(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using mediapump Error
pub type Result<T> = std::result::Result<T, Error>;
