//! Agent configuration.
//!
//! The recognized options mirror the host-facing surface of the decoder
//! agent: the root schema path, the fully-qualified message type, and the
//! payload keys to read from and write to. Option values may contain
//! `{{ key }}` placeholders resolved from each incoming event before use.

use crate::agent::Event;
use crate::error::AgentError;
use crate::template;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the decoder agent.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Path to the root .proto schema file
    #[clap(long)]
    pub proto_file: String,

    /// Fully-qualified protobuf message type (including package name,
    /// e.g. "meshtastic.ServiceEnvelope")
    #[clap(long)]
    pub message_type: String,

    /// Payload key holding the base64-encoded protobuf message
    #[clap(long, default_value = "payload")]
    #[serde(default = "default_input_key")]
    pub input_key: String,

    /// Payload key the decoded message is stored under in the output
    #[clap(long, default_value = "decoded")]
    #[serde(default = "default_output_key")]
    pub output_key: String,
}

fn default_input_key() -> String {
    "payload".to_string()
}

fn default_output_key() -> String {
    "decoded".to_string()
}

impl AgentConfig {
    /// Validate the configuration before any event is processed.
    ///
    /// Failures here are fatal to agent activation, not per-event. A
    /// templated schema path can only be checked once an event supplies
    /// its placeholder values, so its existence check is deferred.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.proto_file.trim().is_empty() {
            return Err(AgentError::InvalidConfig("proto_file is required".to_string()));
        }
        if self.message_type.trim().is_empty() {
            return Err(AgentError::InvalidConfig("message_type is required".to_string()));
        }
        if self.input_key.is_empty() {
            return Err(AgentError::InvalidConfig("input_key must not be empty".to_string()));
        }
        if self.output_key.is_empty() {
            return Err(AgentError::InvalidConfig("output_key must not be empty".to_string()));
        }
        if !template::is_templated(&self.proto_file) && !Path::new(&self.proto_file).exists() {
            return Err(AgentError::InvalidConfig(format!(
                "proto_file '{}' does not exist",
                self.proto_file
            )));
        }
        Ok(())
    }

    /// Resolve `{{ key }}` placeholders in every option from an event
    /// payload.
    pub fn interpolated(&self, payload: &Event) -> AgentConfig {
        AgentConfig {
            proto_file: template::interpolate(&self.proto_file, payload),
            message_type: template::interpolate(&self.message_type, payload),
            input_key: template::interpolate(&self.input_key, payload),
            output_key: template::interpolate(&self.output_key, payload),
        }
    }
}
