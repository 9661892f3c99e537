//! Benchmark executable flag generation.
//!
//! Each (parameter, value) pair becomes a short-form flag for
//! single-character names and a long-form flag otherwise. Execution uses
//! argument vectors, so values need no quoting; the quoted string form
//! exists for diagnostics only.

use serde_json::Value;

/// Plain-text rendering of a parameter value: strings unquoted, everything
/// else in its JSON form.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Argument vector for one combination, e.g. `["-N", "4096", "--fold", "1"]`.
pub fn flag_args(pairs: &[(String, Value)]) -> Vec<String> {
    let mut args = Vec::with_capacity(pairs.len() * 2);
    for (name, value) in pairs {
        if name.chars().count() == 1 {
            args.push(format!("-{name}"));
        } else {
            args.push(format!("--{name}"));
        }
        args.push(value_text(value));
    }
    args
}

/// Display form with quoted values, e.g. `-N "4096" --fold "1"`.
pub fn flag_string(pairs: &[(String, Value)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| {
            let text = value_text(value);
            if name.chars().count() == 1 {
                format!("-{name} \"{text}\"")
            } else {
                format!("--{name} \"{text}\"")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
