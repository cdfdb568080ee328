//! Translation from DTDL primitive schema tags to host attribute types.
//!
//! Only primitives are translated. Any other tag (enums, objects, maps,
//! semantic types) passes through unchanged with an empty-string default; the
//! translator never fails.

use serde::Serialize;
use serde_json::Value;

/// Default value attached to a translated attribute type.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
}

/// Host attribute type for a DTDL schema tag.
pub fn target_type(schema_tag: &str) -> &str {
    match schema_tag {
        "boolean" => "bool",
        "integer" => "int",
        "long" => "int64",
        // float, double and string share their names with the host types, as
        // does every tag we do not unpack.
        other => other,
    }
}

/// Type-appropriate default for a DTDL schema tag.
pub fn default_value(schema_tag: &str) -> DefaultValue {
    match schema_tag {
        "boolean" => DefaultValue::Bool(false),
        "integer" => DefaultValue::Int(0),
        "long" => DefaultValue::Int64(0),
        "float" => DefaultValue::Float(0.0),
        "double" => DefaultValue::Double(0.0),
        _ => DefaultValue::String(String::new()),
    }
}

/// Source tag for a raw `schema` value.
///
/// Strings are used as-is. Complex schema records are identified by their
/// lower-cased `@type` (`"Enum"` becomes `"enum"`), falling back to
/// `"object"` when the record carries no usable type.
pub fn schema_tag(schema: &Value) -> Option<String> {
    match schema {
        Value::String(tag) => Some(tag.clone()),
        Value::Object(record) => Some(
            record
                .get("@type")
                .and_then(Value::as_str)
                .map(str::to_ascii_lowercase)
                .unwrap_or_else(|| "object".to_string()),
        ),
        _ => None,
    }
}
