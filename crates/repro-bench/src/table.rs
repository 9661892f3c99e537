//! Append-only benchmark result table.

use std::fs;
use std::io::BufWriter;
use std::path::Path;

use csv::WriterBuilder;
use repro_core::{ErrorInfo, ReproError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::flags::value_text;

/// Key of one result row: the test identity plus its parameter tuple, with
/// values canonicalized to text so keys order deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultKey {
    /// Test identity.
    pub test: String,
    /// Flattened (parameter, value) pairs in sweep order.
    pub params: Vec<(String, String)>,
}

impl ResultKey {
    /// Builds a key from a test name and a combination's (name, value)
    /// pairs.
    pub fn new(test: impl Into<String>, pairs: &[(String, Value)]) -> Self {
        Self {
            test: test.into(),
            params: pairs
                .iter()
                .map(|(name, value)| (name.clone(), value_text(value)))
                .collect(),
        }
    }

    fn params_text(&self) -> String {
        self.params
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Mapping from (test, parameter tuple) to a recorded attribute value.
/// Append-only while a harness runs; reporting consumes it afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    entries: BTreeMap<ResultKey, Value>,
}

impl ResultTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an attribute value against a key.
    pub fn insert(&mut self, key: ResultKey, value: Value) {
        self.entries.insert(key, value);
    }

    /// Looks up the value recorded for a key.
    pub fn get(&self, key: &ResultKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Number of recorded rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates rows in deterministic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ResultKey, &Value)> {
        self.entries.iter()
    }

    /// Writes the table as CSV (`plan_hash,test,params,value`), one row per
    /// entry in deterministic order.
    pub fn write_csv(&self, path: &Path, plan_hash: &str) -> Result<(), ReproError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| table_io(path, err))?;
        }
        let file = fs::File::create(path).map_err(|err| table_io(path, err))?;
        let mut writer = WriterBuilder::new().from_writer(BufWriter::new(file));
        writer
            .write_record(["plan_hash", "test", "params", "value"])
            .map_err(|err| table_csv(path, err))?;
        for (key, value) in &self.entries {
            let params = key.params_text();
            let value = value_text(value);
            writer
                .write_record([plan_hash, key.test.as_str(), params.as_str(), value.as_str()])
                .map_err(|err| table_csv(path, err))?;
        }
        writer.flush().map_err(|err| table_io(path, err))?;
        Ok(())
    }
}

fn table_io(path: &Path, err: impl ToString) -> ReproError {
    ReproError::Io(
        ErrorInfo::new("table.io", err.to_string())
            .with_context("path", path.display().to_string()),
    )
}

fn table_csv(path: &Path, err: impl ToString) -> ReproError {
    ReproError::Serde(
        ErrorInfo::new("table.csv", err.to_string())
            .with_context("path", path.display().to_string()),
    )
}
