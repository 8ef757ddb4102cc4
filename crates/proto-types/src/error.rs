//! Error types for normalization.

use thiserror::Error;

/// Errors that can occur while flattening a decoded message.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("message type not found in registry: {0}")]
    UnknownMessageType(String),

    #[error("invalid timestamp: seconds={seconds}, nanos={nanos}")]
    InvalidTimestamp { seconds: i64, nanos: u32 },

    #[error("value of kind {kind} does not match declared type {declared}")]
    TypeMismatch { declared: String, kind: &'static str },
}

/// Result type alias for normalization.
pub type Result<T> = std::result::Result<T, NormalizeError>;
