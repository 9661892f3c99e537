//! Resolve-once hardware characterization.
//!
//! One [`Characterizer`] instance owns the probe, the configuration
//! overrides, and the metadata location, and resolves each hardware field
//! at most once for its lifetime. Resolution order per field: manual
//! configuration override first, probed value second, fatal configuration
//! error third. A probe that fails outright counts as "no runtime value"
//! and never propagates.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use repro_core::{ErrorInfo, ReproError};

use crate::config::HostConfig;
use crate::metadata::{KernelMetadata, METADATA_RELATIVE_PATH};
use crate::probe::{CpuProbe, CpuSample, HostProbe};

/// Snapshot of the characterized host, as consumed by the performance
/// model.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareProfile {
    /// Vectorization target of the generated kernels.
    pub vectorization: String,
    /// CPU clock frequency in Hz.
    pub freq_hz: f64,
    /// Fused multiply-add support.
    pub fma: bool,
    /// Cache size in bytes.
    pub cache_bytes: u64,
}

/// A named field resolved at most once. Replaces the scattered
/// one-global-per-getter memoization of earlier tooling with a single
/// generic cell keyed by field name.
#[derive(Debug)]
struct OnceField<T> {
    name: &'static str,
    cell: OnceCell<T>,
}

impl<T: Clone> OnceField<T> {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceCell::new(),
        }
    }

    /// Returns the cached value, resolving it on first use. Once resolved
    /// the value never changes for this instance, even if the resolver
    /// would answer differently later.
    fn resolve_with(
        &self,
        resolve: impl FnOnce(&'static str) -> Result<T, ReproError>,
    ) -> Result<T, ReproError> {
        if let Some(value) = self.cell.get() {
            return Ok(value.clone());
        }
        let value = resolve(self.name)?;
        Ok(self.cell.get_or_init(|| value).clone())
    }
}

/// Process-wide hardware characterization service.
///
/// Intended to live as long as the benchmarking process; fields resolve
/// lazily and stick. Not `Sync`: the pipeline is single-threaded by
/// design, and a concurrent reimplementation would need to swap the cells
/// for a synchronized resolve-once primitive.
pub struct Characterizer {
    probe: Box<dyn CpuProbe>,
    config: HostConfig,
    metadata_path: PathBuf,
    sample: OnceCell<CpuSample>,
    metadata: OnceCell<KernelMetadata>,
    vectorization: OnceField<String>,
    freq_hz: OnceField<f64>,
    fma: OnceField<bool>,
    cache_bytes: OnceField<u64>,
}

impl std::fmt::Debug for Characterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Characterizer")
            .field("config", &self.config)
            .field("metadata_path", &self.metadata_path)
            .finish_non_exhaustive()
    }
}

impl Characterizer {
    /// Creates a characterizer from an explicit probe, configuration, and
    /// metadata document path.
    pub fn new(probe: Box<dyn CpuProbe>, config: HostConfig, metadata_path: PathBuf) -> Self {
        Self {
            probe,
            config,
            metadata_path,
            sample: OnceCell::new(),
            metadata: OnceCell::new(),
            vectorization: OnceField::new("vectorization"),
            freq_hz: OnceField::new("freq"),
            fma: OnceField::new("fma"),
            cache_bytes: OnceField::new("cache"),
        }
    }

    /// Conventional setup for a project root: host probe, no overrides,
    /// metadata at `scripts/getter.json`.
    pub fn for_project(top: &Path) -> Self {
        Self::new(
            Box::new(HostProbe),
            HostConfig::default(),
            top.join(METADATA_RELATIVE_PATH),
        )
    }

    /// Replaces the configuration overrides (builder form).
    pub fn with_config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// The probe result, sampled at most once. A probe error is absorbed
    /// into an empty sample here.
    fn sample(&self) -> &CpuSample {
        self.sample
            .get_or_init(|| self.probe.sample().unwrap_or_default())
    }

    /// The kernel metadata document, loaded at most once. Load failures are
    /// fatal and re-reported on every call until a load succeeds.
    pub fn metadata(&self) -> Result<&KernelMetadata, ReproError> {
        match self.metadata.get() {
            Some(metadata) => Ok(metadata),
            None => {
                let loaded = KernelMetadata::load(&self.metadata_path)?;
                Ok(self.metadata.get_or_init(|| loaded))
            }
        }
    }

    /// Vectorization target of the generated kernels, from the metadata
    /// document.
    pub fn vectorization(&self) -> Result<String, ReproError> {
        self.vectorization
            .resolve_with(|_| Ok(self.metadata()?.vectorization.clone()))
    }

    /// CPU clock frequency in Hz.
    pub fn freq_hz(&self) -> Result<f64, ReproError> {
        self.freq_hz
            .resolve_with(|name| resolve_field(name, self.config.freq_hz, self.sample().freq_hz))
    }

    /// Fused multiply-add support.
    pub fn fma(&self) -> Result<bool, ReproError> {
        self.fma
            .resolve_with(|name| resolve_field(name, self.config.fma, self.sample().fma))
    }

    /// Cache size in bytes.
    pub fn cache_bytes(&self) -> Result<u64, ReproError> {
        self.cache_bytes
            .resolve_with(|name| resolve_field(name, self.config.cache_bytes, self.sample().cache_bytes))
    }

    /// Resolves every field and returns the profile snapshot.
    pub fn profile(&self) -> Result<HardwareProfile, ReproError> {
        Ok(HardwareProfile {
            vectorization: self.vectorization()?,
            freq_hz: self.freq_hz()?,
            fma: self.fma()?,
            cache_bytes: self.cache_bytes()?,
        })
    }
}

/// Override beats probe; neither present is a fatal configuration error
/// naming the field and the remediation.
fn resolve_field<T>(
    field: &'static str,
    manual: Option<T>,
    probed: Option<T>,
) -> Result<T, ReproError> {
    if let Some(value) = manual {
        return Ok(value);
    }
    if let Some(value) = probed {
        return Ok(value);
    }
    Err(ReproError::Config(
        ErrorInfo::new(
            "config.field_missing",
            format!("CPU {field} not found by runtime probing"),
        )
        .with_context("field", field)
        .with_hint(format!("supply `{field}` in the host configuration file")),
    ))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;

    use super::*;

    struct CountingProbe {
        calls: std::rc::Rc<Cell<u32>>,
    }

    impl CpuProbe for CountingProbe {
        fn sample(&self) -> Result<CpuSample, ReproError> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            // A second sample would answer differently; memoization must
            // make that unobservable.
            Ok(CpuSample {
                freq_hz: Some(1e9 * f64::from(call)),
                fma: Some(call % 2 == 1),
                cache_bytes: Some(u64::from(call) * 1024),
            })
        }
    }

    struct FailingProbe;

    impl CpuProbe for FailingProbe {
        fn sample(&self) -> Result<CpuSample, ReproError> {
            Err(ReproError::Io(ErrorInfo::new("probe.broken", "no cpuid")))
        }
    }

    fn metadata_file(dir: &Path) -> PathBuf {
        let path = dir.join("getter.json");
        fs::write(
            &path,
            r#"{"vectorization":"AVX","dimaxindex":33,"simaxindex":18,
                "dimaxfold":16,"simaxfold":9,"didefaultfold":3,
                "sidefaultfold":3,"diendurance":2048,"siendurance":256}"#,
        )
        .expect("write metadata");
        path
    }

    #[test]
    fn fields_resolve_at_most_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = std::rc::Rc::new(Cell::new(0));
        let service = Characterizer::new(
            Box::new(CountingProbe {
                calls: calls.clone(),
            }),
            HostConfig::default(),
            metadata_file(dir.path()),
        );
        let first = service.freq_hz().expect("freq");
        let second = service.freq_hz().expect("freq again");
        assert_eq!(first, second);
        assert_eq!(first, 1e9);
        // fma/cache reuse the single sample too.
        assert_eq!(service.fma().expect("fma"), true);
        assert_eq!(service.cache_bytes().expect("cache"), 1024);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn config_override_beats_probed_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = Characterizer::new(
            Box::new(CountingProbe {
                calls: std::rc::Rc::new(Cell::new(0)),
            }),
            HostConfig {
                freq_hz: Some(2.5e9),
                ..HostConfig::default()
            },
            metadata_file(dir.path()),
        );
        assert_eq!(service.freq_hz().expect("freq"), 2.5e9);
    }

    #[test]
    fn failing_probe_falls_through_to_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = Characterizer::new(
            Box::new(FailingProbe),
            HostConfig {
                freq_hz: Some(3e9),
                fma: Some(false),
                cache_bytes: Some(262_144),
            },
            metadata_file(dir.path()),
        );
        let profile = service.profile().expect("profile");
        assert_eq!(profile.freq_hz, 3e9);
        assert!(!profile.fma);
        assert_eq!(profile.cache_bytes, 262_144);
        assert_eq!(profile.vectorization, "AVX");
    }

    #[test]
    fn missing_field_is_fatal_and_named() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = Characterizer::new(
            Box::new(FailingProbe),
            HostConfig::default(),
            metadata_file(dir.path()),
        );
        let err = service.cache_bytes().expect_err("must fail");
        assert_eq!(err.info().code, "config.field_missing");
        assert_eq!(err.info().context.get("field").map(String::as_str), Some("cache"));
        assert!(err.to_string().contains("host configuration"));
    }

    #[test]
    fn missing_metadata_surfaces_through_vectorization() {
        let service = Characterizer::new(
            Box::new(FailingProbe),
            HostConfig::default(),
            PathBuf::from("/no/such/top/scripts/getter.json"),
        );
        let err = service.vectorization().expect_err("must fail");
        assert_eq!(err.info().code, "metadata.missing");
        assert!(err.to_string().contains("update"));
    }
}
