//! Schema-driven encoder: [`DecodedMessage`] → wire bytes.
//!
//! Counterpart of the decoder, used by the round-trip tests and fixture
//! tooling to produce valid wire encodings without generated code. The
//! encoding follows the proto3 wire format: each present field is written
//! as (tag, value) pairs in schema declaration order; repeated scalars are
//! written unpacked; nested messages and map entries as length-delimited
//! submessages.

use crate::error::{Error, Result};
use proto_types::{DecodedMessage, FieldType, FieldValue, ScalarType, SchemaRegistry};
use protobuf::CodedOutputStream;

/// Encode a decoded message back into protobuf binary format.
pub fn encode_message(registry: &SchemaRegistry, message: &DecodedMessage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut stream = CodedOutputStream::vec(&mut buffer);
        write_message(registry, message, &mut stream)?;
        stream
            .flush()
            .map_err(|e| Error::Encode(e.to_string()))?;
    }
    Ok(buffer)
}

fn write_message(
    registry: &SchemaRegistry,
    message: &DecodedMessage,
    stream: &mut CodedOutputStream,
) -> Result<()> {
    let descriptor = registry
        .message(&message.message_type)
        .ok_or_else(|| Error::MessageTypeNotFound(message.message_type.clone()))?;

    for name in descriptor.field_names() {
        let Some(value) = message.get(name) else {
            continue;
        };
        let Some(field) = descriptor.field(name) else {
            continue;
        };
        write_field(registry, &field.field_type, field.number as u32, value, stream)?;
    }
    Ok(())
}

fn write_field(
    registry: &SchemaRegistry,
    field_type: &FieldType,
    number: u32,
    value: &FieldValue,
    stream: &mut CodedOutputStream,
) -> Result<()> {
    match value {
        FieldValue::Repeated(items) => {
            for item in items {
                write_single(registry, field_type, number, item, stream)?;
            }
            Ok(())
        }
        FieldValue::Map(entries) => {
            let FieldType::Map { key, value: value_type } = field_type else {
                return Err(Error::Encode(format!(
                    "map value written to non-map field type {field_type}"
                )));
            };
            let key_type = FieldType::Scalar(*key);
            for (entry_key, entry_value) in entries {
                let mut entry = Vec::new();
                {
                    let mut entry_stream = CodedOutputStream::vec(&mut entry);
                    write_single(registry, &key_type, 1, entry_key, &mut entry_stream)?;
                    write_single(registry, value_type, 2, entry_value, &mut entry_stream)?;
                    entry_stream
                        .flush()
                        .map_err(|e| Error::Encode(e.to_string()))?;
                }
                stream
                    .write_bytes(number, &entry)
                    .map_err(|e| Error::Encode(e.to_string()))?;
            }
            Ok(())
        }
        single => write_single(registry, field_type, number, single, stream),
    }
}

fn write_single(
    registry: &SchemaRegistry,
    field_type: &FieldType,
    number: u32,
    value: &FieldValue,
    stream: &mut CodedOutputStream,
) -> Result<()> {
    match (field_type, value) {
        (FieldType::Scalar(ScalarType::Double), FieldValue::Double(v)) => stream
            .write_double(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Float), FieldValue::Float(v)) => stream
            .write_float(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Int32), FieldValue::Int32(v)) => stream
            .write_int32(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Int64), FieldValue::Int64(v)) => stream
            .write_int64(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Uint32), FieldValue::Uint32(v)) => stream
            .write_uint32(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Uint64), FieldValue::Uint64(v)) => stream
            .write_uint64(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Sint32), FieldValue::Int32(v)) => stream
            .write_sint32(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Sint64), FieldValue::Int64(v)) => stream
            .write_sint64(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Fixed32), FieldValue::Uint32(v)) => stream
            .write_fixed32(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Fixed64), FieldValue::Uint64(v)) => stream
            .write_fixed64(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Sfixed32), FieldValue::Int32(v)) => stream
            .write_sfixed32(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Sfixed64), FieldValue::Int64(v)) => stream
            .write_sfixed64(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Bool), FieldValue::Bool(v)) => stream
            .write_bool(number, *v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::String), FieldValue::String(v)) => stream
            .write_string(number, v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Scalar(ScalarType::Bytes), FieldValue::Bytes(v)) => stream
            .write_bytes(number, v)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Enum(_), FieldValue::Enum { number: value, .. }) => stream
            .write_int32(number, *value)
            .map_err(|e| Error::Encode(e.to_string())),
        (FieldType::Message(_), FieldValue::Message(nested)) => {
            let mut nested_bytes = Vec::new();
            {
                let mut nested_stream = CodedOutputStream::vec(&mut nested_bytes);
                write_message(registry, nested, &mut nested_stream)?;
                nested_stream
                    .flush()
                    .map_err(|e| Error::Encode(e.to_string()))?;
            }
            stream
                .write_bytes(number, &nested_bytes)
                .map_err(|e| Error::Encode(e.to_string()))
        }
        (field_type, value) => Err(Error::Encode(format!(
            "cannot encode {} value into field of type {field_type}",
            value.kind()
        ))),
    }
}
