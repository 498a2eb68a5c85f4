//! Tool parameter sanitization.
//!
//! Produces the copy of the caller's parameters that a handler receives:
//!
//! | Input | Result |
//! |-------|--------|
//! | key not matching `[A-Za-z0-9_]+` | dropped |
//! | string | inline `<script>…</script>` fragments removed |
//! | number | kept if finite |
//! | boolean | kept |
//! | array | truncated to [`MAX_ARRAY_LEN`] elements |
//! | null, object | dropped |
//!
//! The original, unsanitized object is what the ledger persists.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Longest array a handler will ever see.
pub const MAX_ARRAY_LEN: usize = 100;

static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid regex"));

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));

pub fn is_valid_key(key: &str) -> bool {
    KEY_RE.is_match(key)
}

pub fn strip_scripts(s: &str) -> String {
    SCRIPT_RE.replace_all(s, "").into_owned()
}

fn sanitize_value(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => Some(Value::String(strip_scripts(s))),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|_| Value::Number(n.clone())),
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::Array(items) => Some(Value::Array(
            items.iter().take(MAX_ARRAY_LEN).cloned().collect(),
        )),
        Value::Null | Value::Object(_) => None,
    }
}

/// Return the sanitized copy of a parameter object.
pub fn sanitize_params(params: &Map<String, Value>) -> Map<String, Value> {
    params
        .iter()
        .filter(|(key, _)| is_valid_key(key))
        .filter_map(|(key, value)| sanitize_value(value).map(|v| (key.clone(), v)))
        .collect()
}
