#![deny(missing_docs)]
#![doc = "Hardware characterization for reprobench: runtime CPU probing, host configuration overrides, persisted kernel metadata, and the resolve-once characterization service."]

pub mod config;
pub mod metadata;
pub mod probe;
pub mod profile;

pub use config::HostConfig;
pub use metadata::{KernelMetadata, METADATA_RELATIVE_PATH};
pub use probe::{CpuProbe, CpuSample, HostProbe};
pub use profile::{Characterizer, HardwareProfile};
