#![deny(missing_docs)]
#![doc = "Benchmark orchestration for reprobench: parameter sweeps, flag generation, output parsing, suites and the harness drive loop, and the keyed result table."]

pub mod flags;
pub mod harness;
pub mod parse;
pub mod sweep;
pub mod table;

pub use flags::{flag_args, flag_string, value_text};
pub use harness::{Attribute, BenchCase, Harness, RunContext, Suite};
pub use parse::parse_output;
pub use sweep::{ParamGroup, Sweep};
pub use table::{ResultKey, ResultTable};
