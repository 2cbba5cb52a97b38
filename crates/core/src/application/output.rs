// Structured-output parsing for generation responses
//
// Models answer in free text that should contain JSON, sometimes inside a
// Markdown fence. Only "a list of zero or more records" is accepted.

use crate::error::{AppError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::OnceLock;

fn fenced_block() -> &'static Regex {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    FENCED.get_or_init(|| {
        Regex::new(r"(?i)```(json)?\s*([\s\S]+?)\s*```").expect("fenced block pattern is valid")
    })
}

fn parse_error(message: impl Into<String>, raw: &str) -> AppError {
    AppError::Parse {
        message: message.into(),
        raw: raw.to_string(),
    }
}

/// Locate and parse the JSON value in a model response.
///
/// 1. First fenced block, if any: its inner content must parse.
/// 2. Otherwise the whole (trimmed) text must parse.
pub fn extract_json(text: &str) -> Result<Value> {
    let candidate = match fenced_block().captures(text).and_then(|c| c.get(2)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    };

    serde_json::from_str(candidate).map_err(|e| {
        parse_error(
            format!("Could not parse JSON from the model's response: {}", e),
            text,
        )
    })
}

/// Coerce a parsed value into a list: a single object becomes a one-element list.
pub fn normalize_records(value: Value, raw: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        other => Err(parse_error(
            format!("Expected a JSON list of records, got {}", kind(&other)),
            raw,
        )),
    }
}

/// Full pipeline: extract, normalize, then decode each record as `T`.
pub fn parse_records<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    let value = extract_json(text)?;
    normalize_records(value, text)?
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .map_err(|e| parse_error(format!("Record #{} has an unexpected shape: {}", i, e), text))
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
