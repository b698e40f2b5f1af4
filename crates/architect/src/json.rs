//! JSON parsing and option-layer merging.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// JSON object type used for target options.
pub type JsonObject = Map<String, Value>;

/// Parse a document strictly.
///
/// # Errors
///
/// Returns [`Error::Json`] when `bytes` is not valid UTF-8 JSON.
pub fn parse_strict(path: &Path, bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|err| Error::json(path, err.to_string()))
}

/// Parse a document loosely: line and block comments and trailing commas are
/// accepted. Package manifests are read this way.
///
/// # Errors
///
/// Returns [`Error::Json`] when the document cannot be parsed or is empty.
pub fn parse_loose(path: &Path, bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes).map_err(|err| Error::json(path, err.to_string()))?;
    let text = text.trim_start_matches('\u{feff}');

    let value = jsonc_parser::parse_to_value(text, &jsonc_parser::ParseOptions::default())
        .map_err(|err| Error::json(path, err.to_string()))?
        .ok_or_else(|| Error::json(path, "document is empty"))?;

    convert_jsonc_value(path, value)
}

/// Number literals serde_json cannot represent, such as hexadecimal, are
/// rejected rather than converted lossily.
fn convert_jsonc_value(path: &Path, value: jsonc_parser::JsonValue<'_>) -> Result<Value> {
    use jsonc_parser::JsonValue;

    Ok(match value {
        JsonValue::Null => Value::Null,
        JsonValue::Boolean(b) => Value::Bool(b),
        JsonValue::Number(literal) => serde_json::from_str::<serde_json::Number>(&literal)
            .map(Value::Number)
            .map_err(|_| Error::json(path, format!("unsupported number literal '{literal}'")))?,
        JsonValue::String(s) => Value::String(s.to_string()),
        JsonValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| convert_jsonc_value(path, item))
                .collect::<Result<_>>()?,
        ),
        JsonValue::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| Ok((key, convert_jsonc_value(path, value)?)))
                .collect::<Result<_>>()?,
        ),
    })
}

/// Merge option layers, later layers winning key by key.
///
/// The merge is shallow: a key present in a later layer replaces the earlier
/// value wholesale, even when both values are objects or arrays.
#[must_use]
pub fn shallow_merge<'a, I>(layers: I) -> JsonObject
where
    I: IntoIterator<Item = &'a JsonObject>,
{
    let mut merged = JsonObject::new();
    for layer in layers {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}
