use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfError {
  #[error("conf is not valid JSON: {0}")]
  InvalidJson(#[from] serde_json::Error),

  #[error("conf must be a JSON object, got {0}")]
  NotAnObject(&'static str),
}

/// Convert a trigger-time conf payload into a canonical JSON object.
///
/// - absent or `null` → `{}`
/// - a JSON object → returned as is
/// - a JSON string → parsed as JSON; must parse to an object
/// - anything else → [`ConfError::NotAnObject`]
///
/// Contents are opaque: keys and values are not validated beyond the
/// object shape.
pub fn normalize_conf(raw: Option<Value>) -> Result<Map<String, Value>, ConfError> {
  match raw {
    None | Some(Value::Null) => Ok(Map::new()),
    Some(Value::Object(map)) => Ok(map),
    Some(Value::String(text)) => match serde_json::from_str::<Value>(&text)? {
      Value::Object(map) => Ok(map),
      other => Err(ConfError::NotAnObject(json_type_name(&other))),
    },
    Some(other) => Err(ConfError::NotAnObject(json_type_name(&other))),
  }
}

fn json_type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
