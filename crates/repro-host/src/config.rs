//! Host configuration overrides for hardware characterization.
//!
//! A field present here is a manual override and always wins over the
//! runtime probe; it is also the only fallback when probing fails, so a
//! host whose CPU cannot be inspected must supply every required field.

use std::fs;
use std::path::Path;

use repro_core::{ErrorInfo, ReproError};
use serde::{Deserialize, Serialize};

/// Manually supplied hardware facts, conventionally kept in a small TOML
/// file next to the benchmark configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// CPU clock frequency in Hz.
    #[serde(default, rename = "freq")]
    pub freq_hz: Option<f64>,
    /// Fused multiply-add support.
    #[serde(default)]
    pub fma: Option<bool>,
    /// Cache size in bytes.
    #[serde(default, rename = "cache")]
    pub cache_bytes: Option<u64>,
}

impl HostConfig {
    /// Loads overrides from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ReproError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            ReproError::Config(
                ErrorInfo::new(
                    "config.read",
                    format!("failed to read host configuration: {err}"),
                )
                .with_context("path", path.display().to_string()),
            )
        })?;
        toml::from_str(&contents).map_err(|err| {
            ReproError::Config(
                ErrorInfo::new("config.parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_partial_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("host.toml");
        fs::write(&path, "freq = 3.2e9\nfma = true\n").expect("write");
        let config = HostConfig::load(&path).expect("load");
        assert_eq!(config.freq_hz, Some(3.2e9));
        assert_eq!(config.fma, Some(true));
        assert_eq!(config.cache_bytes, None);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = HostConfig::load(Path::new("/nonexistent/host.toml")).expect_err("must fail");
        assert_eq!(err.info().code, "config.read");
        assert!(err.info().context.get("path").expect("path").contains("host.toml"));
    }
}
