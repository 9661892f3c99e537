//! Persisted kernel metadata.
//!
//! A separate `make update` step writes a JSON document describing the
//! generated kernels (vectorization target, fold limits, endurance). The
//! document is parsed once, eagerly, into a fully-validated struct; any
//! missing key is rejected at load time rather than on first access.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use repro_core::{ErrorInfo, ReproError};
use serde::{Deserialize, Serialize};

/// Conventional location of the metadata document under the project root.
pub const METADATA_RELATIVE_PATH: &str = "scripts/getter.json";

/// Metadata produced by the update step. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KernelMetadata {
    /// Vectorization target the kernels were generated for (e.g. `AVX`).
    pub vectorization: String,
    /// Maximum fold index, double precision.
    pub dimaxindex: u32,
    /// Maximum fold index, single precision.
    pub simaxindex: u32,
    /// Maximum fold, double precision.
    pub dimaxfold: u32,
    /// Maximum fold, single precision.
    pub simaxfold: u32,
    /// Default fold, double precision.
    pub didefaultfold: u32,
    /// Default fold, single precision.
    pub sidefaultfold: u32,
    /// Endurance limit, double precision.
    pub diendurance: u32,
    /// Endurance limit, single precision.
    pub siendurance: u32,
}

impl KernelMetadata {
    /// Loads and validates the metadata document.
    ///
    /// A missing file is a fatal, user-facing error naming the expected
    /// path and pointing at the update step.
    pub fn load(path: &Path) -> Result<Self, ReproError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ReproError::Metadata(
                    ErrorInfo::new(
                        "metadata.missing",
                        format!("{} not found", path.display()),
                    )
                    .with_context("path", path.display().to_string())
                    .with_hint("did you forget to run \"make update\"?"),
                ));
            }
            Err(err) => {
                return Err(ReproError::Metadata(
                    ErrorInfo::new("metadata.read", err.to_string())
                        .with_context("path", path.display().to_string()),
                ));
            }
        };
        serde_json::from_str(&contents).map_err(|err| {
            ReproError::Metadata(
                ErrorInfo::new("metadata.parse", err.to_string())
                    .with_context("path", path.display().to_string())
                    .with_hint("did you forget to run \"make update\"?"),
            )
        })
    }
}
