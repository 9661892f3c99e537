#![deny(missing_docs)]
#![doc = "Core error types and structured process invocation shared by the reprobench crates."]

pub mod errors;
pub mod process;

pub use errors::{ErrorInfo, ReproError};
pub use process::{CommandOutput, Executor, Invocation};
