//! Normalization: typed decoded messages → generic JSON trees.
//!
//! The output is structurally isomorphic to the schema's field tree:
//! scalars become JSON leaves, nested messages become objects, repeated
//! fields become arrays, and map fields become objects with stringified
//! keys. Recursion is driven by the descriptor's field-type tags, never
//! by inspecting the runtime shape of a value.
//!
//! Presence follows proto3 semantics: fields absent from the wire are
//! omitted from the output, with no default-value materialization.

use crate::descriptor::FieldType;
use crate::error::{NormalizeError, Result};
use crate::registry::SchemaRegistry;
use crate::value::{DecodedMessage, FieldValue};
use base64::Engine;
use serde_json::{Map, Value};
use tracing::debug;

/// Flatten a decoded message into a JSON value.
///
/// Field names in the output are the schema's declared names verbatim,
/// emitted in schema declaration order.
pub fn normalize(registry: &SchemaRegistry, message: &DecodedMessage) -> Result<Value> {
    normalize_message(registry, message)
}

fn normalize_message(registry: &SchemaRegistry, message: &DecodedMessage) -> Result<Value> {
    if message.message_type == "google.protobuf.Timestamp" {
        return timestamp_value(message);
    }

    let descriptor = registry
        .message(&message.message_type)
        .ok_or_else(|| NormalizeError::UnknownMessageType(message.message_type.clone()))?;

    let mut out = Map::new();
    for name in descriptor.field_names() {
        let Some(value) = message.get(name) else {
            continue;
        };
        let Some(field) = descriptor.field(name) else {
            continue;
        };
        out.insert(
            name.clone(),
            normalize_field(registry, &field.field_type, value)?,
        );
    }
    Ok(Value::Object(out))
}

fn normalize_field(registry: &SchemaRegistry, field_type: &FieldType, value: &FieldValue) -> Result<Value> {
    match value {
        FieldValue::Repeated(items) => {
            let values = items
                .iter()
                .map(|item| normalize_field(registry, field_type, item))
                .collect::<Result<Vec<Value>>>()?;
            Ok(Value::Array(values))
        }
        FieldValue::Map(entries) => {
            let FieldType::Map { value: value_type, .. } = field_type else {
                return Err(NormalizeError::TypeMismatch {
                    declared: field_type.type_name(),
                    kind: value.kind(),
                });
            };
            let mut out = Map::new();
            for (key, entry_value) in entries {
                out.insert(
                    map_key_string(key)?,
                    normalize_field(registry, value_type, entry_value)?,
                );
            }
            Ok(Value::Object(out))
        }
        FieldValue::Message(nested) => normalize_message(registry, nested),
        FieldValue::Enum { number, name } => match name {
            Some(name) => Ok(Value::String(name.clone())),
            None => {
                debug!("enum value {number} has no declared name, emitting the raw number");
                Ok(Value::from(*number))
            }
        },
        FieldValue::Double(v) => Ok(Value::from(*v)),
        FieldValue::Float(v) => Ok(Value::from(*v)),
        FieldValue::Int32(v) => Ok(Value::from(*v)),
        FieldValue::Int64(v) => Ok(Value::from(*v)),
        FieldValue::Uint32(v) => Ok(Value::from(*v)),
        FieldValue::Uint64(v) => Ok(Value::from(*v)),
        FieldValue::Bool(v) => Ok(Value::from(*v)),
        FieldValue::String(v) => Ok(Value::from(v.clone())),
        FieldValue::Bytes(v) => Ok(Value::String(
            base64::engine::general_purpose::STANDARD.encode(v),
        )),
    }
}

/// Stringify a map key per the protobuf JSON mapping: integral and bool
/// keys become their decimal/boolean text, string keys pass through.
fn map_key_string(key: &FieldValue) -> Result<String> {
    match key {
        FieldValue::String(s) => Ok(s.clone()),
        FieldValue::Bool(b) => Ok(b.to_string()),
        FieldValue::Int32(v) => Ok(v.to_string()),
        FieldValue::Int64(v) => Ok(v.to_string()),
        FieldValue::Uint32(v) => Ok(v.to_string()),
        FieldValue::Uint64(v) => Ok(v.to_string()),
        other => Err(NormalizeError::TypeMismatch {
            declared: "map key".to_string(),
            kind: other.kind(),
        }),
    }
}

/// Special handling for google.protobuf.Timestamp: RFC 3339 text instead
/// of a {seconds, nanos} object.
fn timestamp_value(message: &DecodedMessage) -> Result<Value> {
    let seconds = match message.get("seconds") {
        Some(FieldValue::Int64(s)) => *s,
        _ => 0,
    };
    let nanos = match message.get("nanos") {
        Some(FieldValue::Int32(n)) => *n as u32,
        _ => 0,
    };
    let datetime = chrono::DateTime::<chrono::Utc>::from_timestamp(seconds, nanos)
        .ok_or(NormalizeError::InvalidTimestamp { seconds, nanos })?;
    Ok(Value::String(datetime.to_rfc3339()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EnumDescriptor, FieldDescriptor, MessageDescriptor, ScalarType};
    use serde_json::json;
    use std::collections::HashMap;

    fn field(name: &str, number: i32, field_type: FieldType, repeated: bool) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            number,
            field_type,
            repeated,
        }
    }

    fn message_descriptor(name: &str, fields: Vec<FieldDescriptor>) -> MessageDescriptor {
        MessageDescriptor {
            name: name.to_string(),
            field_order: fields.iter().map(|f| f.name.clone()).collect(),
            fields: fields.into_iter().map(|f| (f.name.clone(), f)).collect(),
        }
    }

    fn envelope_registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry.insert_message(message_descriptor(
            "demo.Envelope",
            vec![
                field("id", 1, FieldType::Scalar(ScalarType::String), false),
                field("values", 2, FieldType::Scalar(ScalarType::Int32), true),
                field("inner", 3, FieldType::Message("demo.Inner".to_string()), false),
            ],
        ));
        registry.insert_message(message_descriptor(
            "demo.Inner",
            vec![field("flag", 1, FieldType::Scalar(ScalarType::Bool), false)],
        ));
        registry
    }

    #[test]
    fn test_normalize_scalars_nested_and_repeated() {
        let registry = envelope_registry();

        let mut inner = DecodedMessage::new("demo.Inner");
        inner.set("flag", FieldValue::Bool(true));

        let mut envelope = DecodedMessage::new("demo.Envelope");
        envelope.set("id", FieldValue::String("a".to_string()));
        envelope.set(
            "values",
            FieldValue::Repeated(vec![
                FieldValue::Int32(1),
                FieldValue::Int32(2),
                FieldValue::Int32(3),
            ]),
        );
        envelope.set("inner", FieldValue::Message(Box::new(inner)));

        let normalized = normalize(&registry, &envelope).unwrap();
        assert_eq!(
            normalized,
            json!({"id": "a", "values": [1, 2, 3], "inner": {"flag": true}})
        );
    }

    #[test]
    fn test_unset_fields_are_omitted() {
        let registry = envelope_registry();
        let mut envelope = DecodedMessage::new("demo.Envelope");
        envelope.set("id", FieldValue::String("a".to_string()));

        let normalized = normalize(&registry, &envelope).unwrap();
        assert_eq!(normalized, json!({"id": "a"}));
    }

    #[test]
    fn test_undeclared_fields_are_ignored() {
        let registry = envelope_registry();
        let mut envelope = DecodedMessage::new("demo.Envelope");
        envelope.set("id", FieldValue::String("z".to_string()));
        envelope.set("stray", FieldValue::Int32(9));

        let normalized = normalize(&registry, &envelope).unwrap();
        assert_eq!(normalized, json!({"id": "z"}));
    }

    #[test]
    fn test_normalize_enum_name_and_fallback() {
        let mut registry = SchemaRegistry::new();
        registry.insert_enum(EnumDescriptor {
            name: "demo.Status".to_string(),
            values: HashMap::from([(0, "UNKNOWN".to_string()), (1, "ACTIVE".to_string())]),
        });
        registry.insert_message(message_descriptor(
            "demo.Entity",
            vec![field("status", 1, FieldType::Enum("demo.Status".to_string()), false)],
        ));

        let mut entity = DecodedMessage::new("demo.Entity");
        entity.set(
            "status",
            FieldValue::Enum {
                number: 1,
                name: Some("ACTIVE".to_string()),
            },
        );
        assert_eq!(
            normalize(&registry, &entity).unwrap(),
            json!({"status": "ACTIVE"})
        );

        entity.set(
            "status",
            FieldValue::Enum {
                number: 9,
                name: None,
            },
        );
        assert_eq!(normalize(&registry, &entity).unwrap(), json!({"status": 9}));
    }

    #[test]
    fn test_normalize_map_and_bytes() {
        let mut registry = SchemaRegistry::new();
        registry.insert_message(message_descriptor(
            "demo.Blob",
            vec![
                field(
                    "counts",
                    1,
                    FieldType::Map {
                        key: ScalarType::String,
                        value: Box::new(FieldType::Scalar(ScalarType::Int64)),
                    },
                    false,
                ),
                field("data", 2, FieldType::Scalar(ScalarType::Bytes), false),
            ],
        ));

        let mut blob = DecodedMessage::new("demo.Blob");
        blob.set(
            "counts",
            FieldValue::Map(vec![
                (FieldValue::String("a".to_string()), FieldValue::Int64(1)),
                (FieldValue::String("b".to_string()), FieldValue::Int64(2)),
            ]),
        );
        blob.set("data", FieldValue::Bytes(vec![0xde, 0xad, 0xbe, 0xef]));

        let normalized = normalize(&registry, &blob).unwrap();
        assert_eq!(
            normalized,
            json!({"counts": {"a": 1, "b": 2}, "data": "3q2+7w=="})
        );
    }

    #[test]
    fn test_normalize_timestamp() {
        let mut registry = SchemaRegistry::new();
        registry.insert_message(message_descriptor(
            "demo.Event",
            vec![field(
                "at",
                1,
                FieldType::Message("google.protobuf.Timestamp".to_string()),
                false,
            )],
        ));

        let mut at = DecodedMessage::new("google.protobuf.Timestamp");
        at.set("seconds", FieldValue::Int64(1718451045));
        at.set("nanos", FieldValue::Int32(500_000_000));

        let mut event = DecodedMessage::new("demo.Event");
        event.set("at", FieldValue::Message(Box::new(at)));

        let normalized = normalize(&registry, &event).unwrap();
        assert_eq!(
            normalized,
            json!({"at": "2024-06-15T11:30:45.500+00:00"})
        );
    }

    #[test]
    fn test_unknown_nested_type_is_reported() {
        let registry = envelope_registry();
        let mut message = DecodedMessage::new("demo.Missing");
        message.set("id", FieldValue::String("a".to_string()));

        let err = normalize(&registry, &message).unwrap_err();
        assert!(matches!(err, NormalizeError::UnknownMessageType(name) if name == "demo.Missing"));
    }

    #[test]
    fn test_uint64_width_preserved() {
        let mut registry = SchemaRegistry::new();
        registry.insert_message(message_descriptor(
            "demo.Wide",
            vec![field("n", 1, FieldType::Scalar(ScalarType::Uint64), false)],
        ));

        let mut wide = DecodedMessage::new("demo.Wide");
        wide.set("n", FieldValue::Uint64(u64::MAX));

        let normalized = normalize(&registry, &wide).unwrap();
        assert_eq!(normalized, json!({"n": u64::MAX}));
    }
}
