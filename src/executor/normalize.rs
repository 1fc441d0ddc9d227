use serde_json::{Map, Value};

use crate::error::EncodingError;

/// Recursively convert every scalar leaf to its string form.
///
/// Maps and sequences keep their shape. A `null` leaf cannot be encoded and fails with
/// the path to it.
pub fn normalize(value: &Value) -> Result<Value, EncodingError> {
    normalize_at(value, "$")
}

/// Normalize every value of an attribute-value map, keyed paths included in errors.
pub fn normalize_map(values: &Map<String, Value>) -> Result<Map<String, Value>, EncodingError> {
    values
        .iter()
        .map(|(key, value)| Ok::<_, EncodingError>((key.clone(), normalize_at(value, key)?)))
        .collect()
}

fn normalize_at(value: &Value, path: &str) -> Result<Value, EncodingError> {
    match value {
        Value::Null => Err(EncodingError::NullLeaf {
            path: path.to_string(),
        }),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::String(s) => Ok(Value::String(s.clone())),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| normalize_at(item, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| {
                Ok::<_, EncodingError>((key.clone(), normalize_at(item, &format!("{path}.{key}"))?))
            })
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
    }
}
