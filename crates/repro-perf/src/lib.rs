#![deny(missing_docs)]
#![doc = "Operation-count records and the pluggable cost model converting them into theoretical peak time and flop counts."]

pub mod model;
pub mod ops;

pub use model::{CostModel, ReferenceCostModel};
pub use ops::{OpCounts, PeakInput};
