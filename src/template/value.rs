// ABOUTME: Closed variant type for parameter values.
// ABOUTME: Explicit conversions from JSON, parameter files and prompt input.

use serde_json::{Map, Value};
use std::fmt;

use super::ParamType;

/// A concrete, type-checked parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Bool(bool),
    Number(i64),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl ParamValue {
    /// Strict conversion: the JSON value must already have the declared shape.
    ///
    /// Used for saved configuration values, where a mismatch means the
    /// template changed type since the value was stored.
    pub fn from_json(param_type: ParamType, value: &Value) -> Option<Self> {
        match (param_type, value) {
            (ParamType::String, Value::String(s)) => Some(ParamValue::String(s.clone())),
            (ParamType::Bool, Value::Bool(b)) => Some(ParamValue::Bool(*b)),
            (ParamType::Number, Value::Number(n)) => integral(n).map(ParamValue::Number),
            (ParamType::Array, Value::Array(items)) => Some(ParamValue::Array(items.clone())),
            (ParamType::Object, Value::Object(map)) => Some(ParamValue::Object(map.clone())),
            _ => None,
        }
    }

    /// Relaxed conversion for parameter-file values: booleans and numbers
    /// also accept strings that parse as the declared type.
    pub fn from_file_value(param_type: ParamType, value: &Value) -> Option<Self> {
        if let Some(strict) = Self::from_json(param_type, value) {
            return Some(strict);
        }

        match (param_type, value) {
            (ParamType::Bool, Value::String(s)) => parse_bool(s).map(ParamValue::Bool),
            (ParamType::Number, Value::String(s)) => {
                s.trim().parse::<i64>().ok().map(ParamValue::Number)
            }
            _ => None,
        }
    }

    /// Parse free-text prompt input into the declared type.
    pub fn parse_input(param_type: ParamType, input: &str) -> Result<Self, String> {
        match param_type {
            ParamType::String => Ok(ParamValue::String(input.to_string())),
            ParamType::Bool => parse_bool(input)
                .map(ParamValue::Bool)
                .ok_or_else(|| format!("'{input}' is not a boolean")),
            ParamType::Number => input
                .trim()
                .parse::<i64>()
                .map(ParamValue::Number)
                .map_err(|_| format!("'{input}' is not an integer")),
            ParamType::Array => match serde_json::from_str::<Value>(input) {
                Ok(Value::Array(items)) => Ok(ParamValue::Array(items)),
                _ => Err("value must be a JSON array".to_string()),
            },
            ParamType::Object => match serde_json::from_str::<Value>(input) {
                Ok(Value::Object(map)) => Ok(ParamValue::Object(map)),
                _ => Err("value must be a JSON object".to_string()),
            },
        }
    }

    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::String(_) => ParamType::String,
            ParamValue::Bool(_) => ParamType::Bool,
            ParamValue::Number(_) => ParamType::Number,
            ParamValue::Array(_) => ParamType::Array,
            ParamValue::Object(_) => ParamType::Object,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Number(n) => Value::from(*n),
            ParamValue::Array(items) => Value::Array(items.clone()),
            ParamValue::Object(map) => Value::Object(map.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => write!(f, "{s}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Number(n) => write!(f, "{n}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Render any JSON value the way it is shown in selection lists.
pub fn display_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn integral(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}
