//! Shared type definitions for the proto-decode pipeline.
//!
//! This crate holds the pure data model: schema descriptors, the registry
//! they live in, the decoded value representation, and the normalizer that
//! flattens decoded messages into generic JSON trees.
//!
//! # Architecture
//!
//! ```text
//! Load:      .proto files → SchemaRegistry          (proto-codec)
//! Decode:    bytes + MessageDescriptor → DecodedMessage  (proto-codec)
//! Normalize: DecodedMessage → serde_json::Value     (this crate)
//! ```
//!
//! The loading and wire-level decoding logic lives in `proto-codec`; this
//! crate has no dependency on the protobuf runtime, so consumers that only
//! inspect descriptors or normalized output stay lightweight.

pub mod descriptor;
pub mod error;
pub mod normalize;
pub mod registry;
pub mod value;

// Re-export main types for convenient access
pub use descriptor::{EnumDescriptor, FieldDescriptor, FieldType, MessageDescriptor, ScalarType};
pub use error::NormalizeError;
pub use normalize::normalize;
pub use registry::SchemaRegistry;
pub use value::{DecodedMessage, FieldValue};
