//! Schema loading: `.proto` files → [`SchemaRegistry`].
//!
//! Parsing itself is delegated to `protobuf-parse`; this module owns the
//! two things the library does not do for us:
//!
//! - import-path resolution with explicit cycle detection, against a
//!   single search root (the directory containing the root schema file);
//! - translation of the parsed file descriptors into the registry model,
//!   registering nested types under fully-qualified names and folding
//!   synthesized map-entry messages into first-class map field types.
//!
//! Supported dialect is proto3; proto2 group fields are rejected.

use crate::error::{Error, Result};
use proto_types::{
    EnumDescriptor, FieldDescriptor, FieldType, MessageDescriptor, ScalarType, SchemaRegistry,
};
use protobuf::descriptor::{DescriptorProto, EnumDescriptorProto, FieldDescriptorProto};
use protobuf_parse::Parser;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parse a root `.proto` file and its transitive imports into a registry.
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<SchemaRegistry> {
    let root = path
        .as_ref()
        .canonicalize()
        .map_err(|e| Error::SchemaRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
    let include_root = root
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    // Walk the import graph ourselves first: a missing import or a cycle
    // must fail deterministically before the parser ever sees the files.
    check_import_graph(&root, &include_root)?;

    let mut parser = Parser::new();
    parser.input(&root);
    parser.include(&include_root);

    let parsed = parser
        .parse_and_typecheck()
        .map_err(|e| Error::SchemaParse(e.to_string()))?;

    let registry = build_registry(&parsed.file_descriptors)?;
    debug!(
        "loaded schema {} ({} message types)",
        root.display(),
        registry.message_count()
    );
    Ok(registry)
}

/// Parse schema text, going through a temp file so import resolution and
/// error reporting behave exactly like [`load_schema`].
pub fn load_schema_str(content: &str) -> Result<SchemaRegistry> {
    use std::io::Write;

    let mut temp_file = tempfile::NamedTempFile::new().map_err(|e| Error::SchemaRead {
        path: PathBuf::from("<inline schema>"),
        source: e,
    })?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| Error::SchemaRead {
            path: temp_file.path().to_path_buf(),
            source: e,
        })?;

    load_schema(temp_file.path())
}

// ---------------------------------------------------------------------------
// Import graph
// ---------------------------------------------------------------------------

/// Depth-first walk over the import graph.
///
/// All imports, including nested ones, resolve relative to the root
/// schema's directory (single search root). A file already on the visit
/// stack is a cycle; a file visited on another branch is skipped.
fn check_import_graph(root: &Path, include_root: &Path) -> Result<()> {
    let mut visiting: Vec<PathBuf> = Vec::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    visit_imports(root, include_root, &mut visiting, &mut visited)
}

fn visit_imports(
    file: &Path,
    include_root: &Path,
    visiting: &mut Vec<PathBuf>,
    visited: &mut HashSet<PathBuf>,
) -> Result<()> {
    if visiting.iter().any(|p| p == file) {
        let mut chain: Vec<String> = visiting.iter().map(|p| p.display().to_string()).collect();
        chain.push(file.display().to_string());
        return Err(Error::ImportCycle(chain.join(" -> ")));
    }
    if visited.contains(file) {
        return Ok(());
    }

    let text = std::fs::read_to_string(file).map_err(|e| Error::SchemaRead {
        path: file.to_path_buf(),
        source: e,
    })?;

    visited.insert(file.to_path_buf());
    visiting.push(file.to_path_buf());
    for import in scan_imports(&text) {
        let import_path = include_root.join(&import);
        if !import_path.is_file() {
            return Err(Error::ImportNotFound {
                import,
                importer: file.to_path_buf(),
            });
        }
        // Normalize so "./a.proto" and "a.proto" count as the same node.
        let import_path = import_path.canonicalize().map_err(|e| Error::SchemaRead {
            path: import_path.clone(),
            source: e,
        })?;
        visit_imports(&import_path, include_root, visiting, visited)?;
    }
    visiting.pop();
    Ok(())
}

/// Extract import paths from schema text. `import public` and
/// `import weak` are treated as plain imports.
fn scan_imports(text: &str) -> Vec<String> {
    let stripped = strip_comments(text);
    let mut imports = Vec::new();
    for statement in stripped.split([';', '{', '}']) {
        let statement = statement.trim_start();
        let Some(rest) = statement.strip_prefix("import") else {
            continue;
        };
        if !rest.starts_with([' ', '\t', '\r', '\n', '"', '\'']) {
            continue;
        }
        let rest = rest.trim_start();
        let rest = rest
            .strip_prefix("public")
            .or_else(|| rest.strip_prefix("weak"))
            .map(str::trim_start)
            .unwrap_or(rest);
        if let Some(path) = quoted_string(rest) {
            imports.push(path);
        }
    }
    imports
}

/// Read a leading quoted string literal, if any.
fn quoted_string(text: &str) -> Option<String> {
    let mut chars = text.chars();
    let quote = match chars.next() {
        Some(c @ ('"' | '\'')) => c,
        _ => return None,
    };
    let mut out = String::new();
    for c in chars {
        if c == quote {
            return Some(out);
        }
        out.push(c);
    }
    None
}

/// Remove `//` and `/* */` comments, leaving string literals intact.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(quote) = in_string {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                in_string = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Registry construction
// ---------------------------------------------------------------------------

fn build_registry(
    files: &[protobuf::descriptor::FileDescriptorProto],
) -> Result<SchemaRegistry> {
    // Pass 1: collect every message (top-level and nested) under its
    // fully-qualified name, plus all enum tables.
    let mut raw_messages: Vec<(String, &DescriptorProto)> = Vec::new();
    let mut enums: Vec<EnumDescriptor> = Vec::new();
    for file in files {
        let package = file.package.clone().unwrap_or_default();
        for message in &file.message_type {
            collect_message(&package, message, &mut raw_messages, &mut enums);
        }
        for enum_proto in &file.enum_type {
            enums.push(build_enum(&package, enum_proto));
        }
    }

    // Pass 2: map-entry messages are folded into map field types and are
    // not resolvable message types themselves.
    let map_entries: HashMap<&str, &DescriptorProto> = raw_messages
        .iter()
        .filter(|(_, proto)| is_map_entry(proto))
        .map(|(fqn, proto)| (fqn.as_str(), *proto))
        .collect();

    let mut registry = SchemaRegistry::new();
    for enum_descriptor in enums {
        registry.insert_enum(enum_descriptor);
    }
    for (fqn, proto) in &raw_messages {
        if is_map_entry(proto) {
            continue;
        }
        registry.insert_message(build_message(fqn, proto, &map_entries)?);
    }
    Ok(registry)
}

fn collect_message<'a>(
    prefix: &str,
    message: &'a DescriptorProto,
    out: &mut Vec<(String, &'a DescriptorProto)>,
    enums: &mut Vec<EnumDescriptor>,
) {
    let name = message.name.clone().unwrap_or_default();
    if name.is_empty() {
        return;
    }
    let fqn = qualify(prefix, &name);
    for nested in &message.nested_type {
        collect_message(&fqn, nested, out, enums);
    }
    for enum_proto in &message.enum_type {
        enums.push(build_enum(&fqn, enum_proto));
    }
    out.push((fqn, message));
}

fn build_enum(prefix: &str, enum_proto: &EnumDescriptorProto) -> EnumDescriptor {
    let name = enum_proto.name.clone().unwrap_or_default();
    let mut values = HashMap::new();
    for value in &enum_proto.value {
        if let (Some(value_name), Some(number)) = (value.name.clone(), value.number) {
            // First declaration wins when allow_alias maps one number to
            // several names.
            values.entry(number).or_insert(value_name);
        }
    }
    EnumDescriptor {
        name: qualify(prefix, &name),
        values,
    }
}

fn build_message(
    fqn: &str,
    proto: &DescriptorProto,
    map_entries: &HashMap<&str, &DescriptorProto>,
) -> Result<MessageDescriptor> {
    let mut fields = HashMap::new();
    let mut field_order = Vec::new();

    for field in &proto.field {
        let field_name = field.name.clone().unwrap_or_default();
        if field_name.is_empty() {
            continue;
        }

        let raw_type = resolve_field_type(field)?;
        let mut repeated = field.label
            == Some(protobuf::descriptor::field_descriptor_proto::Label::LABEL_REPEATED.into());

        let field_type = match &raw_type {
            FieldType::Message(type_name) => match map_entries.get(type_name.as_str()) {
                Some(entry) => {
                    repeated = false;
                    build_map_type(type_name, entry)?
                }
                None => raw_type,
            },
            _ => raw_type,
        };

        field_order.push(field_name.clone());
        fields.insert(
            field_name.clone(),
            FieldDescriptor {
                name: field_name,
                number: field.number.unwrap_or(0),
                field_type,
                repeated,
            },
        );
    }

    Ok(MessageDescriptor {
        name: fqn.to_string(),
        fields,
        field_order,
    })
}

/// Fold a synthesized map-entry message (key field 1, value field 2)
/// into a map field type.
fn build_map_type(entry_name: &str, entry: &DescriptorProto) -> Result<FieldType> {
    let key_field = entry
        .field
        .iter()
        .find(|f| f.number == Some(1))
        .ok_or_else(|| Error::SchemaParse(format!("map entry {entry_name} has no key field")))?;
    let value_field = entry
        .field
        .iter()
        .find(|f| f.number == Some(2))
        .ok_or_else(|| Error::SchemaParse(format!("map entry {entry_name} has no value field")))?;

    let key = match resolve_field_type(key_field)? {
        FieldType::Scalar(scalar) => scalar,
        other => {
            return Err(Error::SchemaParse(format!(
                "map entry {entry_name} has non-scalar key type {other}"
            )))
        }
    };
    let value = resolve_field_type(value_field)?;
    Ok(FieldType::Map {
        key,
        value: Box::new(value),
    })
}

fn resolve_field_type(field: &FieldDescriptorProto) -> Result<FieldType> {
    use protobuf::descriptor::field_descriptor_proto::Type;

    let field_type_enum_or_unknown = field.type_.ok_or_else(|| {
        Error::SchemaParse(format!(
            "field '{}' is missing its type",
            field.name.as_deref().unwrap_or_default()
        ))
    })?;
    let field_type_enum = field_type_enum_or_unknown.enum_value_or_default();

    Ok(match field_type_enum {
        Type::TYPE_DOUBLE => FieldType::Scalar(ScalarType::Double),
        Type::TYPE_FLOAT => FieldType::Scalar(ScalarType::Float),
        Type::TYPE_INT32 => FieldType::Scalar(ScalarType::Int32),
        Type::TYPE_INT64 => FieldType::Scalar(ScalarType::Int64),
        Type::TYPE_UINT32 => FieldType::Scalar(ScalarType::Uint32),
        Type::TYPE_UINT64 => FieldType::Scalar(ScalarType::Uint64),
        Type::TYPE_SINT32 => FieldType::Scalar(ScalarType::Sint32),
        Type::TYPE_SINT64 => FieldType::Scalar(ScalarType::Sint64),
        Type::TYPE_FIXED32 => FieldType::Scalar(ScalarType::Fixed32),
        Type::TYPE_FIXED64 => FieldType::Scalar(ScalarType::Fixed64),
        Type::TYPE_SFIXED32 => FieldType::Scalar(ScalarType::Sfixed32),
        Type::TYPE_SFIXED64 => FieldType::Scalar(ScalarType::Sfixed64),
        Type::TYPE_BOOL => FieldType::Scalar(ScalarType::Bool),
        Type::TYPE_STRING => FieldType::Scalar(ScalarType::String),
        Type::TYPE_BYTES => FieldType::Scalar(ScalarType::Bytes),
        Type::TYPE_MESSAGE => FieldType::Message(strip_leading_dot(field.type_name.as_deref())),
        Type::TYPE_ENUM => FieldType::Enum(strip_leading_dot(field.type_name.as_deref())),
        Type::TYPE_GROUP => {
            return Err(Error::SchemaParse(
                "group fields are proto2-only and not supported".to_string(),
            ))
        }
    })
}

/// Typechecked descriptors reference types as ".package.Type"; the
/// registry namespace drops the leading dot.
fn strip_leading_dot(type_name: Option<&str>) -> String {
    let type_name = type_name.unwrap_or_default();
    type_name.strip_prefix('.').unwrap_or(type_name).to_string()
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn is_map_entry(message: &DescriptorProto) -> bool {
    message
        .options
        .as_ref()
        .and_then(|options| options.map_entry)
        .unwrap_or(false)
}
