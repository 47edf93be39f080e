use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::domain::error::DashboardError;

/// Surfaces an explicit application-level `error` field. Null, `false` and empty
/// strings do not count; the CLI bridge emits an empty `error` when stderr was quiet.
pub fn explicit_error(payload: &Value) -> Option<String> {
    match payload.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.trim().is_empty() => None,
        Value::String(message) => Some(message.trim().to_owned()),
        Value::Object(object) => Some(
            object
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| Value::Object(object.clone()).to_string()),
        ),
        other => Some(other.to_string()),
    }
}

pub fn reject_explicit_error(payload: &Value) -> Result<(), DashboardError> {
    match explicit_error(payload) {
        Some(message) => Err(DashboardError::Remote(message)),
        None => Ok(()),
    }
}

/// Parses a read response. Only objects and arrays count; anything else (an HTML
/// error page, a truncated body, a bare scalar) is a decode failure.
pub fn document(body: &str) -> Result<Value, DashboardError> {
    let payload = serde_json::from_str::<Value>(body)
        .map_err(|error| DashboardError::Decode(format!("response is not json: {error}")))?;
    if payload.is_object() || payload.is_array() {
        Ok(payload)
    } else {
        Err(DashboardError::Decode(
            "response is not a json object or array".to_owned(),
        ))
    }
}

/// Finds the first array under `keys` (or the payload itself when it is an array)
/// and decodes its items. Items that do not decode are dropped; a missing key is an
/// empty collection.
pub fn collection<T: DeserializeOwned>(payload: &Value, keys: &[&str]) -> Vec<T> {
    let items = match payload {
        Value::Array(items) => Some(items),
        other => keys
            .iter()
            .find_map(|key| other.get(*key).and_then(Value::as_array)),
    };

    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                debug!("dropping undecodable item: {error}");
                None
            }
        })
        .collect()
}

pub fn raw_collection(payload: &Value, key: &str) -> Vec<Value> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Decodes an object payload leniently, falling back to the type's default shape.
pub fn object_or_default<T: DeserializeOwned + Default>(payload: &Value) -> T {
    if !payload.is_object() {
        return T::default();
    }
    serde_json::from_value(payload.clone()).unwrap_or_else(|error| {
        debug!("falling back to empty payload: {error}");
        T::default()
    })
}

/// Interprets a mutating call's body: an explicit error or `ok: false` is a failure.
pub fn mutation_result(payload: Value) -> Result<Value, DashboardError> {
    reject_explicit_error(&payload)?;
    if payload.get("ok").and_then(Value::as_bool) == Some(false) {
        return Err(DashboardError::Remote("request was rejected".to_owned()));
    }
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(DashboardError::Remote("request was rejected".to_owned()));
    }
    Ok(payload)
}
