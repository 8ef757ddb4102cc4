//! Decoded message values.
//!
//! Runtime representation of protobuf values after decoding. Instances
//! are ephemeral: they exist only between a decode call and the
//! normalization of its result.

use std::collections::HashMap;

/// A single decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Double(f64),
    Float(f32),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    /// Enum value; `name` is resolved from the enum descriptor when the
    /// number is a declared value.
    Enum { number: i32, name: Option<String> },
    Message(Box<DecodedMessage>),
    Repeated(Vec<FieldValue>),
    /// Map entries in wire order, deduplicated so later keys override
    /// earlier ones.
    Map(Vec<(FieldValue, FieldValue)>),
}

impl FieldValue {
    /// Short value-kind label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Double(_) => "double",
            FieldValue::Float(_) => "float",
            FieldValue::Int32(_) => "int32",
            FieldValue::Int64(_) => "int64",
            FieldValue::Uint32(_) => "uint32",
            FieldValue::Uint64(_) => "uint64",
            FieldValue::Bool(_) => "bool",
            FieldValue::String(_) => "string",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Enum { .. } => "enum",
            FieldValue::Message(_) => "message",
            FieldValue::Repeated(_) => "repeated",
            FieldValue::Map(_) => "map",
        }
    }
}

/// A decoded protobuf message.
///
/// Holds only the fields present on the wire; unset proto3 scalars are
/// absent rather than materialized with default values.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// Fully-qualified message type name (e.g. "mypackage.MyMessage")
    pub message_type: String,
    /// Decoded field values by field name
    pub fields: HashMap<String, FieldValue>,
}

impl DecodedMessage {
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            fields: HashMap::new(),
        }
    }

    /// Get a decoded field value by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Set a field value, replacing any previous one.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) -> &mut Self {
        self.fields.insert(name.into(), value);
        self
    }
}
