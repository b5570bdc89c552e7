//! Boundary decoding for backend payloads.
//!
//! The backend is loosely typed: numbers sometimes arrive as strings, optional
//! sections are sometimes `null`, and lists occasionally contain junk. Every
//! field of the public types is routed through one of these deserializers so
//! that a bad field becomes `None` (or an empty list) and the rest of the
//! payload still decodes.

use crate::error::CoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Reads a finite number from a JSON number or a numeric string.
pub fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

/// Non-empty strings are kept; numbers are stringified; anything else is `None`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Truthiness in the loose sense the backend relies on.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    })
}

pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A nested section. Anything that is not an object decodes to the default.
pub fn lenient_object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(object_from_value(value).unwrap_or_default())
}

/// Like [`lenient_object`] but keeps the absence visible.
pub fn lenient_optional_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(object_from_value(value))
}

/// A list of objects. Non-arrays decode to an empty list and non-object
/// elements are dropped.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(list_from_value(value))
}

/// A list of numbers where each unreadable entry counts as zero.
pub fn lenient_numbers<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .iter()
            .map(|item| number_from_value(item).unwrap_or(0.0))
            .collect(),
        _ => Vec::new(),
    })
}

pub fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Writes whole numbers as JSON integers so integer fields on the backend
/// accept them unchanged.
pub fn integral_as_integer<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => serializer.serialize_i64(*v as i64),
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

fn object_from_value<T: DeserializeOwned>(value: Value) -> Option<T> {
    if value.is_object() {
        serde_json::from_value(value).ok()
    } else {
        None
    }
}

fn list_from_value<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(object_from_value).collect(),
        _ => Vec::new(),
    }
}

/// Decodes a top-level object payload.
pub fn decode_object<T: DeserializeOwned>(what: &'static str, value: Value) -> Result<T, CoreError> {
    if !value.is_object() {
        return Err(CoreError::InvalidPayload {
            what,
            reason: format!("expected a JSON object, got {}", kind_of(&value)),
        });
    }
    serde_json::from_value(value).map_err(|e| CoreError::InvalidPayload {
        what,
        reason: e.to_string(),
    })
}

/// Decodes a top-level array payload, dropping malformed elements.
pub fn decode_list<T: DeserializeOwned>(what: &'static str, value: Value) -> Result<Vec<T>, CoreError> {
    if !value.is_array() {
        return Err(CoreError::InvalidPayload {
            what,
            reason: format!("expected a JSON array, got {}", kind_of(&value)),
        });
    }
    Ok(list_from_value(value))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
