//! Structured error types shared across reprobench crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`ReproError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, exit codes, field names, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the operator resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

/// Canonical error type for the reprobench pipeline.
///
/// There are no automatic retries anywhere: a failure is either a
/// deliberately-absorbed probe (the caller asked for the non-throwing form)
/// or a fatal stop carrying a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum ReproError {
    /// An external command exited nonzero or could not be spawned.
    #[error("command error: {0}")]
    Command(ErrorInfo),
    /// A requested binary is missing after a build attempt.
    #[error("build error: {0}")]
    Build(ErrorInfo),
    /// A required hardware field is absent from probing and configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// The persisted kernel metadata document is absent or incomplete.
    #[error("metadata error: {0}")]
    Metadata(ErrorInfo),
    /// External tool or benchmark output could not be interpreted.
    #[error("parse error: {0}")]
    Parse(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Filesystem errors outside of command execution.
    #[error("io error: {0}")]
    Io(ErrorInfo),
}

impl ReproError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            ReproError::Command(info)
            | ReproError::Build(info)
            | ReproError::Config(info)
            | ReproError::Metadata(info)
            | ReproError::Parse(info)
            | ReproError::Serde(info)
            | ReproError::Io(info) => info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context_and_hint() {
        let err = ReproError::Metadata(
            ErrorInfo::new("metadata.missing", "scripts/getter.json not found")
                .with_context("path", "/tmp/top/scripts/getter.json")
                .with_hint("did you forget to run \"make update\"?"),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("metadata.missing"));
        assert!(rendered.contains("path=/tmp/top/scripts/getter.json"));
        assert!(rendered.contains("make update"));
    }

    #[test]
    fn info_returns_payload_for_every_variant() {
        let info = ErrorInfo::new("x", "y");
        for err in [
            ReproError::Command(info.clone()),
            ReproError::Build(info.clone()),
            ReproError::Config(info.clone()),
            ReproError::Metadata(info.clone()),
            ReproError::Parse(info.clone()),
            ReproError::Serde(info.clone()),
            ReproError::Io(info.clone()),
        ] {
            assert_eq!(err.info().code, "x");
        }
    }
}
