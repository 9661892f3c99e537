//! Pluggable operation-cost model.
//!
//! The exact cost weights are host-architecture configuration; the
//! contract is the interface: a fully-defaulted record in, scalar seconds
//! (or a flop count) out. Both functions treat every operation-kind key as
//! significant even when zero.

use crate::ops::{OpCounts, PeakInput};

/// Converts operation counts into theoretical peak figures.
pub trait CostModel {
    /// Theoretical best-case execution time in seconds for the recorded
    /// work on the characterized hardware.
    fn peak_time(&self, input: &PeakInput) -> f64;

    /// Raw floating-point operation count for the recorded work. `fma`
    /// is the host's fused multiply-add availability; models may weigh
    /// fused ops differently with and without it.
    fn flop_count(&self, counts: &OpCounts, fma: bool) -> u64;
}

/// Default cost model.
///
/// Each add/mul/cmp/orb is one vector issue; a fused multiply-add is one
/// issue when the host supports FMA and two (multiply then add) when it
/// does not. Lane counts per precision come from the vectorization
/// descriptor. Peak seconds = total issues / lanes / frequency.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceCostModel;

impl ReferenceCostModel {
    /// (double, single) lane counts for a vectorization descriptor.
    /// Unknown descriptors fall back to scalar execution.
    pub fn lanes(vectorization: &str) -> (f64, f64) {
        let upper = vectorization.to_ascii_uppercase();
        if upper.starts_with("AVX512") {
            (8.0, 16.0)
        } else if upper.starts_with("AVX") {
            (4.0, 8.0)
        } else if upper.starts_with("SSE") || upper.starts_with("NEON") {
            (2.0, 4.0)
        } else {
            (1.0, 1.0)
        }
    }
}

impl CostModel for ReferenceCostModel {
    fn peak_time(&self, input: &PeakInput) -> f64 {
        let counts = &input.counts;
        let fma_issues = if input.fma { 1 } else { 2 };
        let d_issues = counts.d_add + counts.d_mul + counts.d_cmp + counts.d_orb
            + counts.d_fma * fma_issues;
        let s_issues = counts.s_add + counts.s_mul + counts.s_cmp + counts.s_orb
            + counts.s_fma * fma_issues;
        if d_issues == 0 && s_issues == 0 {
            return 0.0;
        }
        let (d_lanes, s_lanes) = Self::lanes(&input.vectorization);
        let cycles = d_issues as f64 / d_lanes + s_issues as f64 / s_lanes;
        cycles / input.freq_hz
    }

    fn flop_count(&self, counts: &OpCounts, _fma: bool) -> u64 {
        // A fused op is two floating-point operations whether or not the
        // host can issue it fused.
        counts.total() + counts.s_fma + counts.d_fma
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn input(counts: OpCounts, vectorization: &str, freq_hz: f64, fma: bool) -> PeakInput {
        PeakInput {
            counts,
            vectorization: vectorization.to_string(),
            freq_hz,
            fma,
        }
    }

    #[test]
    fn zero_record_is_zero_everywhere() {
        let model = ReferenceCostModel;
        let zero = input(OpCounts::default(), "AVX", 3e9, true);
        assert_eq!(model.peak_time(&zero), 0.0);
        assert_eq!(model.flop_count(&zero.counts, true), 0);
        assert_eq!(model.flop_count(&zero.counts, false), 0);
    }

    #[test]
    fn fma_availability_halves_fused_issue_cost() {
        let model = ReferenceCostModel;
        let counts = OpCounts {
            d_fma: 800,
            ..OpCounts::default()
        };
        let with = model.peak_time(&input(counts, "SCALAR", 1e9, true));
        let without = model.peak_time(&input(counts, "SCALAR", 1e9, false));
        assert_eq!(with, 800.0 / 1e9);
        assert_eq!(without, 1600.0 / 1e9);
    }

    #[test]
    fn lane_table_matches_descriptors() {
        assert_eq!(ReferenceCostModel::lanes("AVX512"), (8.0, 16.0));
        assert_eq!(ReferenceCostModel::lanes("avx2"), (4.0, 8.0));
        assert_eq!(ReferenceCostModel::lanes("AVX"), (4.0, 8.0));
        assert_eq!(ReferenceCostModel::lanes("SSE4.2"), (2.0, 4.0));
        assert_eq!(ReferenceCostModel::lanes("NEON"), (2.0, 4.0));
        assert_eq!(ReferenceCostModel::lanes("unknown"), (1.0, 1.0));
    }

    #[test]
    fn wider_vectors_never_slow_the_peak() {
        let model = ReferenceCostModel;
        let counts = OpCounts {
            d_add: 4096,
            d_mul: 4096,
            s_add: 1024,
            ..OpCounts::default()
        };
        let scalar = model.peak_time(&input(counts, "SCALAR", 2e9, true));
        let sse = model.peak_time(&input(counts, "SSE", 2e9, true));
        let avx = model.peak_time(&input(counts, "AVX", 2e9, true));
        assert!(scalar > sse);
        assert!(sse > avx);
    }

    #[test]
    fn fused_ops_count_double_in_flops() {
        let model = ReferenceCostModel;
        let counts = OpCounts {
            d_add: 10,
            d_fma: 5,
            s_fma: 2,
            ..OpCounts::default()
        };
        assert_eq!(model.flop_count(&counts, true), 10 + 2 * 5 + 2 * 2);
        assert_eq!(model.flop_count(&counts, false), 10 + 2 * 5 + 2 * 2);
    }

    proptest! {
        /// Missing keys behave exactly like explicit zeros.
        #[test]
        fn partial_records_equal_zero_filled_records(
            d_add in 0u64..1_000_000,
            d_mul in 0u64..1_000_000,
            fma in proptest::bool::ANY,
        ) {
            let model = ReferenceCostModel;
            let mut partial = BTreeMap::new();
            partial.insert("d_add".to_string(), json!(d_add));
            partial.insert("d_mul".to_string(), json!(d_mul));
            let sparse = OpCounts::from_partial(&partial);
            let explicit = OpCounts {
                d_add,
                d_mul,
                ..OpCounts::default()
            };
            prop_assert_eq!(sparse, explicit);
            let sparse_in = PeakInput {
                counts: sparse,
                vectorization: "AVX".to_string(),
                freq_hz: 3e9,
                fma,
            };
            let explicit_in = PeakInput { counts: explicit, ..sparse_in.clone() };
            prop_assert_eq!(model.peak_time(&sparse_in), model.peak_time(&explicit_in));
            prop_assert_eq!(model.flop_count(&sparse, fma), model.flop_count(&explicit, fma));
        }
    }
}
