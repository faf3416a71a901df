//! Parameter extraction helpers shared by the built-in tools
//!
//! Absent and `null` are treated the same. A present value of the wrong
//! type is always an error, never silently defaulted.

use serde_json::Value;

use super::ToolError;

fn field<'a>(input: &'a Value, key: &str) -> Option<&'a Value> {
    input.get(key).filter(|v| !v.is_null())
}

/// Required string parameter (may be empty)
pub fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    match field(input, key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ToolError::invalid(key, "a string")),
        None => Err(ToolError::missing(key)),
    }
}

/// Required string parameter that must not be empty
pub fn required_non_empty_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    let value = required_str(input, key)?;
    if value.is_empty() {
        return Err(ToolError::missing(key));
    }
    Ok(value)
}

/// Optional string parameter; empty strings count as absent
pub fn optional_str<'a>(input: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match field(input, key) {
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ToolError::invalid(key, "a string")),
        None => Ok(None),
    }
}

/// Required boolean parameter
pub fn required_bool(input: &Value, key: &str) -> Result<bool, ToolError> {
    match field(input, key) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(ToolError::invalid(key, "a boolean")),
        None => Err(ToolError::missing(key)),
    }
}

/// Optional boolean parameter with a default
pub fn optional_bool(input: &Value, key: &str, default: bool) -> Result<bool, ToolError> {
    match field(input, key) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(ToolError::invalid(key, "a boolean")),
        None => Ok(default),
    }
}

/// Optional integer parameter; floats such as `5.0` are truncated
pub fn optional_int(input: &Value, key: &str) -> Result<Option<i64>, ToolError> {
    match field(input, key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| ToolError::invalid(key, "an integer")),
        Some(_) => Err(ToolError::invalid(key, "an integer")),
        None => Ok(None),
    }
}

/// Required integer parameter
pub fn required_int(input: &Value, key: &str) -> Result<i64, ToolError> {
    optional_int(input, key)?.ok_or_else(|| ToolError::missing(key))
}
