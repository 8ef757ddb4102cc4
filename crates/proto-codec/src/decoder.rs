//! Runtime protobuf decoder.
//!
//! Decodes binary wire data into [`DecodedMessage`] using descriptors
//! from a [`SchemaRegistry`]. The tag loop is hand-rolled over
//! `CodedInputStream`:
//!
//! - unknown field numbers are skipped by wire type (proto3 forward
//!   compatibility), never round-tripped;
//! - repeated scalar fields accept both packed and unpacked encodings;
//! - each known tag's wire type is validated against the descriptor;
//! - only fields present on the wire end up in the decoded message
//!   (no default-value materialization).

use crate::error::{Error, Result};
use proto_types::{
    DecodedMessage, FieldDescriptor, FieldType, FieldValue, MessageDescriptor, ScalarType,
    SchemaRegistry,
};
use protobuf::CodedInputStream;

// Wire types from the protobuf encoding spec.
const WIRE_VARINT: u32 = 0;
const WIRE_FIXED64: u32 = 1;
const WIRE_LEN: u32 = 2;
const WIRE_START_GROUP: u32 = 3;
const WIRE_END_GROUP: u32 = 4;
const WIRE_FIXED32: u32 = 5;

/// Runtime decoder borrowing descriptors from a schema registry.
pub struct Decoder<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Decoder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Decode a protobuf message from bytes.
    ///
    /// Fails with [`Error::MessageTypeNotFound`] when the type is absent
    /// from the registry, and [`Error::Decode`] when the bytes are not a
    /// valid encoding for the resolved descriptor.
    pub fn decode(&self, message_type: &str, data: &[u8]) -> Result<DecodedMessage> {
        let descriptor = self
            .registry
            .message(message_type)
            .ok_or_else(|| Error::MessageTypeNotFound(message_type.to_string()))?;
        let mut stream = CodedInputStream::from_bytes(data);
        self.decode_message(descriptor, &mut stream)
    }

    fn decode_message(
        &self,
        descriptor: &MessageDescriptor,
        stream: &mut CodedInputStream,
    ) -> Result<DecodedMessage> {
        let mut message = DecodedMessage::new(&descriptor.name);

        loop {
            if stream.eof().map_err(|e| Error::Decode(e.to_string()))? {
                break;
            }

            let tag = stream
                .read_raw_varint32()
                .map_err(|e| Error::Decode(e.to_string()))?;
            let field_number = (tag >> 3) as i32;
            let wire_type = tag & 0x7;
            if field_number == 0 {
                return Err(Error::Decode(format!(
                    "invalid field number 0 in message {}",
                    descriptor.name
                )));
            }

            let Some(field) = descriptor.field_by_number(field_number) else {
                // Unknown field: skip for forward compatibility.
                skip_field(wire_type, stream)?;
                continue;
            };

            self.decode_field(field, wire_type, stream, &mut message)?;
        }

        Ok(message)
    }

    fn decode_field(
        &self,
        field: &FieldDescriptor,
        wire_type: u32,
        stream: &mut CodedInputStream,
        message: &mut DecodedMessage,
    ) -> Result<()> {
        if let FieldType::Map { key, value } = &field.field_type {
            expect_wire_type(field, WIRE_LEN, wire_type)?;
            let (entry_key, entry_value) = self.decode_map_entry(field, *key, value, stream)?;
            let slot = message
                .fields
                .entry(field.name.clone())
                .or_insert_with(|| FieldValue::Map(Vec::new()));
            if let FieldValue::Map(entries) = slot {
                // Later entries override earlier ones with the same key.
                entries.retain(|(existing, _)| existing != &entry_key);
                entries.push((entry_key, entry_value));
            }
            return Ok(());
        }

        let element_wire = element_wire_type(&field.field_type);

        if field.repeated {
            if wire_type == WIRE_LEN && element_wire != WIRE_LEN {
                // Packed run of scalar elements.
                let len = stream
                    .read_raw_varint64()
                    .map_err(|e| Error::Decode(e.to_string()))?;
                let old_limit = stream
                    .push_limit(len)
                    .map_err(|e| Error::Decode(e.to_string()))?;
                let mut items = Vec::new();
                loop {
                    if stream.eof().map_err(|e| Error::Decode(e.to_string()))? {
                        break;
                    }
                    items.push(self.decode_value(&field.field_type, stream)?);
                }
                stream.pop_limit(old_limit);
                append_repeated(message, &field.name, items);
                return Ok(());
            }

            expect_wire_type(field, element_wire, wire_type)?;
            let value = self.decode_value(&field.field_type, stream)?;
            append_repeated(message, &field.name, vec![value]);
            return Ok(());
        }

        expect_wire_type(field, element_wire, wire_type)?;
        let value = self.decode_value(&field.field_type, stream)?;
        // Last occurrence wins for duplicated singular fields.
        message.fields.insert(field.name.clone(), value);
        Ok(())
    }

    fn decode_map_entry(
        &self,
        field: &FieldDescriptor,
        key_type: ScalarType,
        value_type: &FieldType,
        stream: &mut CodedInputStream,
    ) -> Result<(FieldValue, FieldValue)> {
        let len = stream
            .read_raw_varint64()
            .map_err(|e| Error::Decode(e.to_string()))?;
        let old_limit = stream
            .push_limit(len)
            .map_err(|e| Error::Decode(e.to_string()))?;

        let mut key = None;
        let mut value = None;
        loop {
            if stream.eof().map_err(|e| Error::Decode(e.to_string()))? {
                break;
            }
            let tag = stream
                .read_raw_varint32()
                .map_err(|e| Error::Decode(e.to_string()))?;
            match tag >> 3 {
                1 => key = Some(decode_scalar(key_type, stream)?),
                2 => value = Some(self.decode_value(value_type, stream)?),
                _ => skip_field(tag & 0x7, stream)?,
            }
        }
        stream.pop_limit(old_limit);

        // Absent key or value fall back to proto3 defaults.
        let key = match key {
            Some(key) => key,
            None => default_scalar(key_type),
        };
        let value = match value {
            Some(value) => value,
            None => self.default_value(field, value_type)?,
        };
        Ok((key, value))
    }

    fn decode_value(&self, field_type: &FieldType, stream: &mut CodedInputStream) -> Result<FieldValue> {
        match field_type {
            FieldType::Scalar(scalar) => decode_scalar(*scalar, stream),
            FieldType::Enum(enum_name) => {
                let number = stream
                    .read_int32()
                    .map_err(|e| Error::Decode(e.to_string()))?;
                let name = self
                    .registry
                    .enum_type(enum_name)
                    .and_then(|descriptor| descriptor.value_name(number))
                    .map(str::to_string);
                Ok(FieldValue::Enum { number, name })
            }
            FieldType::Message(type_name) => {
                let len = stream
                    .read_raw_varint64()
                    .map_err(|e| Error::Decode(e.to_string()))?;
                let old_limit = stream
                    .push_limit(len)
                    .map_err(|e| Error::Decode(e.to_string()))?;
                let nested_descriptor = self
                    .registry
                    .message(type_name)
                    .ok_or_else(|| Error::MessageTypeNotFound(type_name.clone()))?;
                let nested = self.decode_message(nested_descriptor, stream)?;
                stream.pop_limit(old_limit);
                Ok(FieldValue::Message(Box::new(nested)))
            }
            FieldType::Map { .. } => Err(Error::Decode(
                "map entries cannot themselves hold map values".to_string(),
            )),
        }
    }

    /// Proto3 default for an absent map value.
    fn default_value(&self, field: &FieldDescriptor, field_type: &FieldType) -> Result<FieldValue> {
        Ok(match field_type {
            FieldType::Scalar(scalar) => default_scalar(*scalar),
            FieldType::Enum(enum_name) => FieldValue::Enum {
                number: 0,
                name: self
                    .registry
                    .enum_type(enum_name)
                    .and_then(|descriptor| descriptor.value_name(0))
                    .map(str::to_string),
            },
            FieldType::Message(type_name) => {
                let descriptor = self
                    .registry
                    .message(type_name)
                    .ok_or_else(|| Error::MessageTypeNotFound(type_name.clone()))?;
                FieldValue::Message(Box::new(DecodedMessage::new(&descriptor.name)))
            }
            FieldType::Map { .. } => {
                return Err(Error::Decode(format!(
                    "field '{}' has an invalid map-in-map type",
                    field.name
                )))
            }
        })
    }
}

fn append_repeated(message: &mut DecodedMessage, name: &str, items: Vec<FieldValue>) {
    let slot = message
        .fields
        .entry(name.to_string())
        .or_insert_with(|| FieldValue::Repeated(Vec::new()));
    if let FieldValue::Repeated(values) = slot {
        values.extend(items);
    }
}

fn decode_scalar(scalar: ScalarType, stream: &mut CodedInputStream) -> Result<FieldValue> {
    Ok(match scalar {
        ScalarType::Double => FieldValue::Double(
            stream
                .read_double()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Float => FieldValue::Float(
            stream
                .read_float()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Int32 => FieldValue::Int32(
            stream
                .read_int32()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Int64 => FieldValue::Int64(
            stream
                .read_int64()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Uint32 => FieldValue::Uint32(
            stream
                .read_uint32()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Uint64 => FieldValue::Uint64(
            stream
                .read_uint64()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Sint32 => FieldValue::Int32(
            stream
                .read_sint32()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Sint64 => FieldValue::Int64(
            stream
                .read_sint64()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Fixed32 => FieldValue::Uint32(
            stream
                .read_fixed32()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Fixed64 => FieldValue::Uint64(
            stream
                .read_fixed64()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Sfixed32 => FieldValue::Int32(
            stream
                .read_sfixed32()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Sfixed64 => FieldValue::Int64(
            stream
                .read_sfixed64()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Bool => FieldValue::Bool(
            stream
                .read_bool()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::String => FieldValue::String(
            stream
                .read_string()
                .map_err(|e| Error::Decode(e.to_string()))?,
        ),
        ScalarType::Bytes => {
            let bytes = stream
                .read_bytes()
                .map_err(|e| Error::Decode(e.to_string()))?;
            FieldValue::Bytes(bytes.to_vec())
        }
    })
}

fn default_scalar(scalar: ScalarType) -> FieldValue {
    match scalar {
        ScalarType::Double => FieldValue::Double(0.0),
        ScalarType::Float => FieldValue::Float(0.0),
        ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => FieldValue::Int32(0),
        ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => FieldValue::Int64(0),
        ScalarType::Uint32 | ScalarType::Fixed32 => FieldValue::Uint32(0),
        ScalarType::Uint64 | ScalarType::Fixed64 => FieldValue::Uint64(0),
        ScalarType::Bool => FieldValue::Bool(false),
        ScalarType::String => FieldValue::String(String::new()),
        ScalarType::Bytes => FieldValue::Bytes(Vec::new()),
    }
}

/// Wire type a single element of this field type occupies.
fn element_wire_type(field_type: &FieldType) -> u32 {
    match field_type {
        FieldType::Scalar(ScalarType::Double)
        | FieldType::Scalar(ScalarType::Fixed64)
        | FieldType::Scalar(ScalarType::Sfixed64) => WIRE_FIXED64,
        FieldType::Scalar(ScalarType::Float)
        | FieldType::Scalar(ScalarType::Fixed32)
        | FieldType::Scalar(ScalarType::Sfixed32) => WIRE_FIXED32,
        FieldType::Scalar(ScalarType::String)
        | FieldType::Scalar(ScalarType::Bytes)
        | FieldType::Message(_)
        | FieldType::Map { .. } => WIRE_LEN,
        FieldType::Scalar(_) | FieldType::Enum(_) => WIRE_VARINT,
    }
}

fn expect_wire_type(field: &FieldDescriptor, expected: u32, actual: u32) -> Result<()> {
    if expected != actual {
        return Err(Error::Decode(format!(
            "field '{}' ({}) expects wire type {expected}, got {actual}",
            field.name, field.field_type
        )));
    }
    Ok(())
}

/// Skip one unknown field's value by wire type.
fn skip_field(wire_type: u32, stream: &mut CodedInputStream) -> Result<()> {
    match wire_type {
        WIRE_VARINT => {
            stream
                .read_raw_varint64()
                .map_err(|e| Error::Decode(e.to_string()))?;
        }
        WIRE_FIXED64 => {
            stream
                .read_fixed64()
                .map_err(|e| Error::Decode(e.to_string()))?;
        }
        WIRE_LEN => {
            stream
                .read_bytes()
                .map_err(|e| Error::Decode(e.to_string()))?;
        }
        WIRE_FIXED32 => {
            stream
                .read_fixed32()
                .map_err(|e| Error::Decode(e.to_string()))?;
        }
        WIRE_START_GROUP | WIRE_END_GROUP => {
            return Err(Error::Decode(
                "group wire types are proto2-only and not supported".to_string(),
            ))
        }
        other => return Err(Error::Decode(format!("unknown wire type {other}"))),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_schema_str;

    fn envelope_registry() -> SchemaRegistry {
        load_schema_str(
            r#"
            syntax = "proto3";
            package demo;

            message Envelope {
                string id = 1;
                repeated int32 values = 2;
                Inner inner = 3;
            }

            message Inner {
                bool flag = 1;
            }
        "#,
        )
        .expect("Failed to parse proto")
    }

    #[test]
    fn test_decode_scalars_nested_and_repeated() {
        let registry = envelope_registry();
        let decoder = Decoder::new(&registry);

        // id: "a", values: [1, 2, 3] (unpacked), inner: { flag: true }
        let data = [
            0x0a, 0x01, b'a', // field 1, "a"
            0x10, 0x01, // field 2, 1
            0x10, 0x02, // field 2, 2
            0x10, 0x03, // field 2, 3
            0x1a, 0x02, 0x08, 0x01, // field 3, Inner { flag: true }
        ];

        let message = decoder.decode("demo.Envelope", &data).expect("decode failed");
        assert_eq!(message.get("id"), Some(&FieldValue::String("a".to_string())));
        assert_eq!(
            message.get("values"),
            Some(&FieldValue::Repeated(vec![
                FieldValue::Int32(1),
                FieldValue::Int32(2),
                FieldValue::Int32(3),
            ]))
        );
        match message.get("inner") {
            Some(FieldValue::Message(inner)) => {
                assert_eq!(inner.message_type, "demo.Inner");
                assert_eq!(inner.get("flag"), Some(&FieldValue::Bool(true)));
            }
            other => panic!("Expected nested message, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_packed_repeated() {
        let registry = envelope_registry();
        let decoder = Decoder::new(&registry);

        // values as a packed run: field 2, wire type 2, three varints.
        let data = [0x12, 0x03, 0x01, 0x02, 0x03];
        let message = decoder.decode("demo.Envelope", &data).expect("decode failed");
        assert_eq!(
            message.get("values"),
            Some(&FieldValue::Repeated(vec![
                FieldValue::Int32(1),
                FieldValue::Int32(2),
                FieldValue::Int32(3),
            ]))
        );
    }

    #[test]
    fn test_unset_fields_are_absent() {
        let registry = envelope_registry();
        let decoder = Decoder::new(&registry);

        let data = [0x0a, 0x01, b'a'];
        let message = decoder.decode("demo.Envelope", &data).expect("decode failed");
        assert!(message.get("values").is_none());
        assert!(message.get("inner").is_none());
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let registry = envelope_registry();
        let decoder = Decoder::new(&registry);

        // field 9 (unknown, varint), field 10 (unknown, length-delimited),
        // then a known field.
        let data = [
            0x48, 0x2a, // field 9, varint 42
            0x52, 0x03, b'x', b'y', b'z', // field 10, "xyz"
            0x0a, 0x01, b'a', // field 1, "a"
        ];
        let message = decoder.decode("demo.Envelope", &data).expect("decode failed");
        assert_eq!(message.get("id"), Some(&FieldValue::String("a".to_string())));
        assert_eq!(message.fields.len(), 1);
    }

    #[test]
    fn test_truncated_input_is_a_decode_error() {
        let registry = envelope_registry();
        let decoder = Decoder::new(&registry);

        // field 1 claims 5 bytes but only 1 follows.
        let data = [0x0a, 0x05, b'a'];
        let err = decoder.decode("demo.Envelope", &data).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_wire_type_mismatch_is_a_decode_error() {
        let registry = envelope_registry();
        let decoder = Decoder::new(&registry);

        // field 1 (string) sent as a varint.
        let data = [0x08, 0x05];
        let err = decoder.decode("demo.Envelope", &data).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_unknown_message_type() {
        let registry = envelope_registry();
        let decoder = Decoder::new(&registry);

        let err = decoder.decode("demo.Nope", &[]).unwrap_err();
        assert!(matches!(err, Error::MessageTypeNotFound(name) if name == "demo.Nope"));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let registry = envelope_registry();
        let decoder = Decoder::new(&registry);

        let data = [0x0a, 0x01, b'a', 0x10, 0x07];
        let first = decoder.decode("demo.Envelope", &data).expect("decode failed");
        let second = decoder.decode("demo.Envelope", &data).expect("decode failed");
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_map_entries_last_key_wins() {
        let registry = load_schema_str(
            r#"
            syntax = "proto3";
            package demo;

            message Counters {
                map<string, int64> counts = 1;
            }
        "#,
        )
        .expect("Failed to parse proto");
        let decoder = Decoder::new(&registry);

        // counts["a"] = 1, counts["b"] = 2, counts["a"] = 3
        let data = [
            0x0a, 0x05, 0x0a, 0x01, b'a', 0x10, 0x01, // {a: 1}
            0x0a, 0x05, 0x0a, 0x01, b'b', 0x10, 0x02, // {b: 2}
            0x0a, 0x05, 0x0a, 0x01, b'a', 0x10, 0x03, // {a: 3}
        ];
        let message = decoder.decode("demo.Counters", &data).expect("decode failed");
        assert_eq!(
            message.get("counts"),
            Some(&FieldValue::Map(vec![
                (FieldValue::String("b".to_string()), FieldValue::Int64(2)),
                (FieldValue::String("a".to_string()), FieldValue::Int64(3)),
            ]))
        );
    }

    #[test]
    fn test_decode_enum_resolves_names() {
        let registry = load_schema_str(
            r#"
            syntax = "proto3";
            package demo;

            enum Status {
                UNKNOWN = 0;
                ACTIVE = 1;
            }

            message Entity {
                Status status = 1;
            }
        "#,
        )
        .expect("Failed to parse proto");
        let decoder = Decoder::new(&registry);

        let data = [0x08, 0x01];
        let message = decoder.decode("demo.Entity", &data).expect("decode failed");
        assert_eq!(
            message.get("status"),
            Some(&FieldValue::Enum {
                number: 1,
                name: Some("ACTIVE".to_string()),
            })
        );

        // Undeclared value keeps the number, with no name.
        let data = [0x08, 0x09];
        let message = decoder.decode("demo.Entity", &data).expect("decode failed");
        assert_eq!(
            message.get("status"),
            Some(&FieldValue::Enum {
                number: 9,
                name: None,
            })
        );
    }

    #[test]
    fn test_decode_fixed_and_zigzag_scalars() {
        let registry = load_schema_str(
            r#"
            syntax = "proto3";
            package demo;

            message Mixed {
                fixed32 f32 = 1;
                sfixed64 s64 = 2;
                sint32 z32 = 3;
            }
        "#,
        )
        .expect("Failed to parse proto");
        let decoder = Decoder::new(&registry);

        let data = [
            0x0d, 0x07, 0x00, 0x00, 0x00, // fixed32 7
            0x11, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // sfixed64 -1
            0x18, 0x03, // sint32 zigzag(3) = -2
        ];
        let message = decoder.decode("demo.Mixed", &data).expect("decode failed");
        assert_eq!(message.get("f32"), Some(&FieldValue::Uint32(7)));
        assert_eq!(message.get("s64"), Some(&FieldValue::Int64(-1)));
        assert_eq!(message.get("z32"), Some(&FieldValue::Int32(-2)));
    }
}
