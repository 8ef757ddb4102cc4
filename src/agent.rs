//! The decoder agent: per-event pipeline and batch processing.
//!
//! Pipeline per event: read the input key → base64-decode → load schema
//! (cached) → resolve type → decode → normalize → merge the result into
//! the outgoing payload under the output key.

use crate::cache::SchemaCache;
use crate::config::AgentConfig;
use crate::error::AgentError;
use base64::Engine;
use proto_codec::Decoder;
use proto_types::normalize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error};

/// An event payload: arbitrary string keys mapped to arbitrary values.
pub type Event = serde_json::Map<String, Value>;

/// Decodes base64-encoded protobuf payloads carried in events.
///
/// Each agent instance owns its schema cache, so two agents loading
/// differently-versioned schemas with the same type names never collide.
#[derive(Debug)]
pub struct DecoderAgent {
    config: AgentConfig,
    cache: SchemaCache,
}

impl DecoderAgent {
    /// Create an agent, validating its configuration up front.
    ///
    /// Configuration errors block the agent from running at all; nothing
    /// is processed until they are corrected.
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self {
            config,
            cache: SchemaCache::new(),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Process a batch of events.
    ///
    /// Failures are isolated per event: a bad event is logged with enough
    /// context to diagnose and then skipped, without aborting the rest of
    /// the batch or producing an output event for it.
    pub fn receive(&self, events: Vec<Event>) -> Vec<Event> {
        let mut out = Vec::with_capacity(events.len());
        for event in &events {
            match self.process_event(event) {
                Ok(decoded) => out.push(decoded),
                Err(e) => error!(
                    "skipping event (input_key='{}', message_type='{}'): {}",
                    self.config.input_key,
                    self.config.message_type,
                    truncate(&format!("{e:#}"), 240)
                ),
            }
        }
        out
    }

    /// Decode a single event.
    ///
    /// The output event is the input payload with the decoded structure
    /// stored under the configured output key; every other key is
    /// preserved untouched.
    pub fn process_event(&self, event: &Event) -> Result<Event, AgentError> {
        let config = self.config.interpolated(event);

        let encoded = event
            .get(&config.input_key)
            .ok_or_else(|| AgentError::MissingInputKey {
                key: config.input_key.clone(),
            })?;
        let encoded = encoded.as_str().ok_or_else(|| AgentError::NonStringInput {
            key: config.input_key.clone(),
        })?;
        let binary = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|source| AgentError::Base64 {
                key: config.input_key.clone(),
                source,
            })?;

        let registry = self.cache.load(Path::new(&config.proto_file))?;
        let decoder = Decoder::new(&registry);
        let decoded = decoder.decode(&config.message_type, &binary)?;
        let normalized = normalize(&registry, &decoded)?;
        debug!(
            "decoded {} bytes as {} into '{}'",
            binary.len(),
            config.message_type,
            config.output_key
        );

        let mut out = event.clone();
        out.insert(config.output_key, normalized);
        Ok(out)
    }
}

/// Truncate error detail for logging, respecting char boundaries.
fn truncate(detail: &str, max_chars: usize) -> &str {
    match detail.char_indices().nth(max_chars) {
        Some((index, _)) => &detail[..index],
        None => detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 240), "short");
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("äöüß", 2), "äö");
    }
}
