//! proto-decode Library
//!
//! Decodes base64-encoded Protocol Buffers payloads carried in events,
//! using a `.proto` schema file and a fully-qualified message type name
//! resolved at runtime. The decoded structure is merged back into the
//! event payload under a configurable key.
//!
//! # Features
//!
//! - Runtime Protobuf Support: Parse `.proto` files at runtime and decode
//!   messages without code generation
//! - Import Resolution: Transitive imports resolved against the schema
//!   root, with deterministic cycle detection
//! - Normalization: Decoded messages flatten into generic JSON trees
//!   suitable for merging into arbitrary payloads
//! - Schema Caching: Registries are built once per schema path and shared
//!   behind a read-mostly lock
//! - Error Isolation: One malformed event is logged and skipped without
//!   aborting the rest of the batch
//!
//! # CLI Usage
//!
//! ```bash
//! # Decode a JSONL event stream
//! proto-decode decode --proto-file schemas/device.proto \
//!   --message-type demo.Envelope < events.jsonl
//!
//! # Inspect the message types a schema defines
//! proto-decode schema --proto-file schemas/device.proto
//! ```

pub mod agent;
pub mod cache;
pub mod config;
pub mod error;
pub mod template;

// Re-export main types for convenient access
pub use agent::{DecoderAgent, Event};
pub use cache::SchemaCache;
pub use config::AgentConfig;
pub use error::AgentError;

// Re-export the pipeline crates for downstream use
pub use proto_codec;
pub use proto_types;
