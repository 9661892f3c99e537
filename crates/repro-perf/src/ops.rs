//! Operation-count records emitted by benchmark executables.

use std::collections::BTreeMap;

use repro_host::HardwareProfile;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed-shape operation counts: five operation kinds per precision
/// (`s_` single, `d_` double). Every key is always present in a resolved
/// record; a key a producer did not report means zero, never "don't know".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpCounts {
    /// Single-precision additions.
    pub s_add: u64,
    /// Single-precision multiplications.
    pub s_mul: u64,
    /// Single-precision fused multiply-adds.
    pub s_fma: u64,
    /// Single-precision comparisons.
    pub s_cmp: u64,
    /// Single-precision bitwise ors.
    pub s_orb: u64,
    /// Double-precision additions.
    pub d_add: u64,
    /// Double-precision multiplications.
    pub d_mul: u64,
    /// Double-precision fused multiply-adds.
    pub d_fma: u64,
    /// Double-precision comparisons.
    pub d_cmp: u64,
    /// Double-precision bitwise ors.
    pub d_orb: u64,
}

impl OpCounts {
    /// All operation-kind keys, in record order.
    pub const KEYS: [&'static str; 10] = [
        "s_add", "s_mul", "s_fma", "s_cmp", "s_orb", "d_add", "d_mul", "d_fma", "d_cmp", "d_orb",
    ];

    /// Builds a fully-defaulted record from a partial key/value map.
    /// Missing keys default to zero; non-numeric or unknown keys are
    /// ignored.
    pub fn from_partial(partial: &BTreeMap<String, Value>) -> Self {
        let count = |key: &str| partial.get(key).and_then(Value::as_u64).unwrap_or(0);
        Self {
            s_add: count("s_add"),
            s_mul: count("s_mul"),
            s_fma: count("s_fma"),
            s_cmp: count("s_cmp"),
            s_orb: count("s_orb"),
            d_add: count("d_add"),
            d_mul: count("d_mul"),
            d_fma: count("d_fma"),
            d_cmp: count("d_cmp"),
            d_orb: count("d_orb"),
        }
    }

    /// Total of every operation kind, unweighted.
    pub fn total(&self) -> u64 {
        Self::KEYS.iter().map(|key| self.field(key)).sum()
    }

    /// Value of one operation-kind key.
    pub fn field(&self, key: &str) -> u64 {
        match key {
            "s_add" => self.s_add,
            "s_mul" => self.s_mul,
            "s_fma" => self.s_fma,
            "s_cmp" => self.s_cmp,
            "s_orb" => self.s_orb,
            "d_add" => self.d_add,
            "d_mul" => self.d_mul,
            "d_fma" => self.d_fma,
            "d_cmp" => self.d_cmp,
            "d_orb" => self.d_orb,
            _ => 0,
        }
    }

}

/// Fully-defaulted input to the peak-time model: the operation counts plus
/// the three hardware fields needed for normalization. Hardware fields
/// default to the host profile and are overridden by matching keys in the
/// producer's output (`vec`, `freq`, `fma`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakInput {
    /// Operation counts with every key present.
    pub counts: OpCounts,
    /// Vectorization descriptor.
    pub vectorization: String,
    /// Clock frequency in Hz.
    pub freq_hz: f64,
    /// Fused multiply-add availability.
    pub fma: bool,
}

impl PeakInput {
    /// Builds the model input from parsed benchmark output and the host
    /// profile.
    pub fn from_output(output: &BTreeMap<String, Value>, profile: &HardwareProfile) -> Self {
        let vectorization = output
            .get("vec")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| profile.vectorization.clone());
        let freq_hz = output
            .get("freq")
            .and_then(Value::as_f64)
            .unwrap_or(profile.freq_hz);
        let fma = output
            .get("fma")
            .and_then(Value::as_bool)
            .unwrap_or(profile.fma);
        Self {
            counts: OpCounts::from_partial(output),
            vectorization,
            freq_hz,
            fma,
        }
    }
}
