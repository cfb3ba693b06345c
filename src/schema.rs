use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Opaque structured payload exchanged with the brain: state, action or
/// episode configuration.
pub type Schema = Map<String, Value>;

/// Converts any serializable value into a [`Schema`]. The value must
/// serialize to a JSON object.
pub fn to_schema<T: Serialize>(value: &T) -> Result<Schema> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Schema(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Reads a typed value back out of a [`Schema`].
pub fn from_schema<T: DeserializeOwned>(schema: &Schema) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(schema.clone()))?)
}

fn kind_of(val: &Value) -> &'static str {
    match val {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
