//! Benchmark output parsing.
//!
//! Benchmark executables emit `key: value` lines; numbers and booleans are
//! kept typed, anything else stays a string. Lines without a colon are
//! ignored, which lets executables interleave banners and progress text
//! with their records.

use std::collections::BTreeMap;

use serde_json::Value;

/// Parses benchmark output into a key/value map.
pub fn parse_output(text: &str) -> BTreeMap<String, Value> {
    let mut map = BTreeMap::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), parse_value(value.trim()));
    }
    map
}

fn parse_value(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_number() || value.is_boolean() => value,
        _ => Value::String(text.to_string()),
    }
}
