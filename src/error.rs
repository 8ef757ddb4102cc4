//! Agent-level error taxonomy.

use thiserror::Error;

/// Errors surfaced by the decoder agent.
///
/// `InvalidConfig` is raised at validation time, before any event is
/// processed, and blocks the agent from running. Every other variant is
/// a per-event failure: caught at the processing boundary, logged, and
/// the offending event skipped.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("input key '{key}' not found in event payload")]
    MissingInputKey { key: String },

    #[error("input key '{key}' does not hold a string value")]
    NonStringInput { key: String },

    #[error("invalid base64 in '{key}': {source}")]
    Base64 {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error(transparent)]
    Codec(#[from] proto_codec::Error),

    #[error(transparent)]
    Normalize(#[from] proto_types::NormalizeError),
}
