use serde_json::Value;

/// How a field of a partial-update payload was supplied.
#[derive(Debug, PartialEq)]
pub enum NullableValue<T> {
    Omitted,
    Null,
    Present(T),
}

pub fn classify_nullable(optional_value: Option<&Value>) -> Result<NullableValue<String>, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(Value::String(s)) => Ok(NullableValue::Present(s.to_owned())),
        Some(other) => Err(format!("expected string or null, got {other}")),
    }
}

/// Profile lists (specialties, experiences) must be JSON arrays; `null` resets to empty.
pub fn classify_array(optional_value: Option<&Value>) -> Result<NullableValue<Value>, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(value @ Value::Array(_)) => Ok(NullableValue::Present(value.clone())),
        Some(other) => Err(format!("expected array or null, got {other}")),
    }
}
