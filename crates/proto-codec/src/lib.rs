//! Runtime `.proto` support for the proto-decode pipeline.
//!
//! This crate provides:
//! - Schema loading: parse `.proto` files (with import resolution and
//!   cycle detection) into a [`SchemaRegistry`] at runtime, without code
//!   generation
//! - Wire decoding: decode binary protobuf data against the loaded
//!   descriptors
//! - Wire encoding: the schema-driven counterpart used by round-trip
//!   tests and fixture tooling
//!
//! The type definitions (descriptors, registry, decoded values) live in
//! `proto-types`; this crate owns everything that touches the protobuf
//! runtime and the filesystem.

pub mod decoder;
pub mod encode;
pub mod error;
pub mod loader;

// Re-export main entry points for convenient access
pub use decoder::Decoder;
pub use encode::encode_message;
pub use error::{Error, Result};
pub use loader::{load_schema, load_schema_str};
