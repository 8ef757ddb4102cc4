//! Schema descriptor model.
//!
//! These types describe message layouts parsed from `.proto` files. They
//! are built by the loader in `proto-codec` and drive both wire decoding
//! and normalization.

use std::collections::HashMap;

/// Scalar protobuf field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarType {
    /// Get the `.proto` keyword for this scalar type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarType::Double => "double",
            ScalarType::Float => "float",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Sint32 => "sint32",
            ScalarType::Sint64 => "sint64",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Bool => "bool",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Field type tag, decided once at schema load time.
///
/// Normalization and decoding recurse over these tags rather than
/// inspecting runtime values, so a message-typed field and a map field
/// can never be confused.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Scalar(ScalarType),
    /// Message-typed field; carries the fully-qualified type name.
    Message(String),
    /// Enum-typed field; carries the fully-qualified enum name.
    Enum(String),
    /// Map field, folded from the synthesized map-entry message.
    /// Map keys are restricted to integral, bool, and string scalars.
    Map {
        key: ScalarType,
        value: Box<FieldType>,
    },
}

impl FieldType {
    /// Get the human-readable type name.
    pub fn type_name(&self) -> String {
        match self {
            FieldType::Scalar(scalar) => scalar.type_name().to_string(),
            FieldType::Message(name) => format!("message:{name}"),
            FieldType::Enum(name) => format!("enum:{name}"),
            FieldType::Map { key, value } => format!("map<{key}, {}>", value.type_name()),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Describes a single field in a message.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name as declared in the schema
    pub name: String,
    /// Field number (wire tag)
    pub number: i32,
    /// Field type
    pub field_type: FieldType,
    /// Whether the field is repeated (always false for map fields)
    pub repeated: bool,
}

/// Describes a protobuf message type.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor {
    /// Fully-qualified message name (e.g. "mypackage.MyMessage")
    pub name: String,
    /// Map of field names to their descriptors
    pub fields: HashMap<String, FieldDescriptor>,
    /// Field names in schema declaration order
    pub field_order: Vec<String>,
}

impl MessageDescriptor {
    /// Get a field descriptor by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Get a field descriptor by wire number.
    pub fn field_by_number(&self, number: i32) -> Option<&FieldDescriptor> {
        self.fields.values().find(|f| f.number == number)
    }

    /// List all field names in declaration order.
    pub fn field_names(&self) -> &[String] {
        &self.field_order
    }
}

/// Describes a protobuf enum type: number → declared symbol name.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    /// Fully-qualified enum name
    pub name: String,
    /// Value number to symbol name (first declaration wins for aliases)
    pub values: HashMap<i32, String>,
}

impl EnumDescriptor {
    /// Get the declared name for a value number.
    pub fn value_name(&self, number: i32) -> Option<&str> {
        self.values.get(&number).map(String::as_str)
    }
}
