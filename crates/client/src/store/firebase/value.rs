//! Firestore typed-value codec.
//!
//! Firestore's REST API wraps every field in a single-key object naming its
//! type (`{"stringValue": "x"}`, `{"arrayValue": {"values": [...]}}`, ...).
//! Documents inside the engine are plain JSON; this module converts at the
//! adapter boundary.

use serde_json::{Map, Number, Value, json};

use crate::store::{Document, DocumentError};

/// Encode a plain JSON value as a Firestore typed value.
#[must_use]
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or_default() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode).collect::<Vec<_>>() } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Encode every field of a document.
#[must_use]
pub fn encode_fields(fields: &Document) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode(value)))
        .collect()
}

/// Decode a Firestore typed value into plain JSON.
///
/// Timestamps, references and bytes decode to their string form; geo points
/// decode to `{"latitude", "longitude"}`.
///
/// # Errors
///
/// Returns `DocumentError::InvalidValue` for anything that is not a
/// single-key typed value.
pub fn decode(value: &Value) -> Result<Value, DocumentError> {
    let Some(typed) = value.as_object() else {
        return Err(invalid("expected a typed value object", value));
    };
    let mut entries = typed.iter();
    let (Some((kind, inner)), None) = (entries.next(), entries.next()) else {
        return Err(invalid("expected exactly one value type", value));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| invalid("booleanValue", inner)),
        "integerValue" => decode_integer(inner),
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid("doubleValue", inner)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_owned()))
            .ok_or_else(|| invalid(kind, inner)),
        "geoPointValue" => Ok(json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(json!(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(json!(0.0)),
        })),
        "arrayValue" => match inner.get("values") {
            None => Ok(Value::Array(Vec::new())),
            Some(Value::Array(items)) => items
                .iter()
                .map(decode)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Some(other) => Err(invalid("arrayValue.values", other)),
        },
        "mapValue" => match inner.get("fields") {
            None => Ok(Value::Object(Map::new())),
            Some(Value::Object(fields)) => decode_fields(fields).map(Value::Object),
            Some(other) => Err(invalid("mapValue.fields", other)),
        },
        other => Err(DocumentError::InvalidValue(format!(
            "unknown value type `{other}`"
        ))),
    }
}

/// Decode every field of a Firestore document.
///
/// # Errors
///
/// Returns the first field that fails to decode.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Document, DocumentError> {
    fields
        .iter()
        .map(|(name, value)| decode(value).map(|decoded| (name.clone(), decoded)))
        .collect()
}

// int64 travels as a decimal string; some emulators send a bare number.
fn decode_integer(inner: &Value) -> Result<Value, DocumentError> {
    match inner {
        Value::String(s) => s
            .parse::<i64>()
            .map(|i| Value::Number(i.into()))
            .map_err(|_| invalid("integerValue", inner)),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n.clone())),
        _ => Err(invalid("integerValue", inner)),
    }
}

fn invalid(what: &str, value: &Value) -> DocumentError {
    DocumentError::InvalidValue(format!("{what}: {value}"))
}
