//! Parameter sweep specification.
//!
//! A sweep pairs an ordered list of parameter names with an ordered list of
//! same-length value lists, and enumerates them positionally: combination
//! *i* takes the *i*-th value of every list. There is no implicit Cartesian
//! expansion; a caller wanting the cross product supplies it as input.

use repro_core::{ErrorInfo, ReproError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// One parameter position. Usually a single name; a group names co-varying
/// sub-parameters whose values arrive as an array and are flattened
/// positionally into the combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamGroup {
    /// Flattened sub-parameter names.
    pub names: Vec<String>,
}

impl ParamGroup {
    /// A single parameter.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
        }
    }

    /// Co-varying sub-parameters.
    pub fn group<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Zipped parameter sweep: `ranges[p][i]` is parameter `p`'s value in
/// combination `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    /// Parameter names, one group per value list.
    pub params: Vec<ParamGroup>,
    /// Value lists, all of the same length.
    pub ranges: Vec<Vec<Value>>,
}

impl Sweep {
    /// Creates a sweep over single-name parameters.
    pub fn new<I, S>(params: I, ranges: Vec<Vec<Value>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(ParamGroup::single).collect(),
            ranges,
        }
    }

    /// Number of combinations the sweep enumerates.
    pub fn len(&self) -> usize {
        self.ranges.first().map_or(0, Vec::len)
    }

    /// True when the sweep enumerates nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerates every zipped combination as flattened (name, value)
    /// pairs.
    pub fn combinations(&self) -> Result<Vec<Vec<(String, Value)>>, ReproError> {
        if self.params.len() != self.ranges.len() {
            return Err(shape_error(
                "sweep.mismatched_params",
                format!(
                    "{} parameter groups but {} value lists",
                    self.params.len(),
                    self.ranges.len()
                ),
            ));
        }
        let count = self.len();
        for (group, range) in self.params.iter().zip(&self.ranges) {
            if range.len() != count {
                return Err(shape_error(
                    "sweep.ragged_ranges",
                    format!(
                        "value list for {:?} has length {} but the sweep has {} combinations",
                        group.names,
                        range.len(),
                        count
                    ),
                ));
            }
        }

        let mut combinations = Vec::with_capacity(count);
        for idx in 0..count {
            let mut pairs = Vec::new();
            for (group, range) in self.params.iter().zip(&self.ranges) {
                let value = &range[idx];
                if group.names.len() == 1 {
                    pairs.push((group.names[0].clone(), value.clone()));
                    continue;
                }
                let Some(items) = value.as_array() else {
                    return Err(shape_error(
                        "sweep.group_arity",
                        format!(
                            "grouped parameters {:?} need an array value, got {value}",
                            group.names
                        ),
                    ));
                };
                if items.len() != group.names.len() {
                    return Err(shape_error(
                        "sweep.group_arity",
                        format!(
                            "grouped parameters {:?} need {} values, got {}",
                            group.names,
                            group.names.len(),
                            items.len()
                        ),
                    ));
                }
                for (name, item) in group.names.iter().zip(items) {
                    pairs.push((name.clone(), item.clone()));
                }
            }
            combinations.push(pairs);
        }
        Ok(combinations)
    }

    /// Stable hexadecimal hash of the sweep plan. The plan is hashed over a
    /// compact JSON encoding with object keys in sorted order, so the hash
    /// does not depend on how any map in the plan happens to iterate.
    pub fn stable_hash(&self) -> Result<String, ReproError> {
        let plan = serde_json::to_value(self).map_err(hash_error)?;
        let mut bytes = Vec::new();
        write_sorted_json(&plan, &mut bytes)?;
        let digest = Sha256::digest(bytes);
        Ok(format!("{digest:x}"))
    }
}

/// Compact JSON encoding with object keys emitted in sorted order at every
/// nesting level. Arrays keep their positional order.
fn write_sorted_json(value: &Value, out: &mut Vec<u8>) -> Result<(), ReproError> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&str, &Value)> =
                map.iter().map(|(key, item)| (key.as_str(), item)).collect();
            entries.sort_unstable_by_key(|(key, _)| *key);
            out.push(b'{');
            for (idx, (key, item)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key).map_err(hash_error)?;
                out.push(b':');
                write_sorted_json(item, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_sorted_json(item, out)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar).map_err(hash_error)?,
    }
    Ok(())
}

fn hash_error(err: serde_json::Error) -> ReproError {
    ReproError::Serde(ErrorInfo::new("sweep.hash_encode", err.to_string()))
}

fn shape_error(code: &str, message: String) -> ReproError {
    ReproError::Parse(ErrorInfo::new(code, message))
}
