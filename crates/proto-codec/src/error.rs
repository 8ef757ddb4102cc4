//! Error types for schema loading and wire coding.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read schema file {path:?}: {source}")]
    SchemaRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("import '{import}' (imported from {importer:?}) not found in the schema root")]
    ImportNotFound { import: String, importer: PathBuf },

    #[error("schema import cycle detected: {0}")]
    ImportCycle(String),

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("message type not found: {0}")]
    MessageTypeNotFound(String),

    #[error("protobuf decode error: {0}")]
    Decode(String),

    #[error("protobuf encode error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
