//! Runtime CPU probing.
//!
//! Probing is best effort: virtualized, containerized, and cross-compiled
//! environments routinely hide or misreport any of these fields, so every
//! field is optional and a probe that errors out entirely is absorbed by
//! the characterizer rather than propagated.

#[cfg(target_os = "linux")]
use std::fs;

use repro_core::ReproError;

/// Fields a runtime probe managed to determine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CpuSample {
    /// CPU clock frequency in Hz.
    pub freq_hz: Option<f64>,
    /// Fused multiply-add support.
    pub fma: Option<bool>,
    /// Cache size in bytes (L2).
    pub cache_bytes: Option<u64>,
}

/// Source of runtime CPU information. The seam exists so tests can inject
/// deterministic samples and counting probes.
pub trait CpuProbe {
    /// Takes one sample of the host CPU.
    fn sample(&self) -> Result<CpuSample, ReproError>;
}

/// Probe backed by the running host's own facilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

impl CpuProbe for HostProbe {
    fn sample(&self) -> Result<CpuSample, ReproError> {
        Ok(CpuSample {
            freq_hz: probe_freq_hz(),
            fma: probe_fma(),
            cache_bytes: probe_cache_bytes(),
        })
    }
}

#[cfg(target_arch = "x86_64")]
fn probe_fma() -> Option<bool> {
    Some(is_x86_feature_detected!("fma"))
}

#[cfg(not(target_arch = "x86_64"))]
fn probe_fma() -> Option<bool> {
    None
}

#[cfg(target_os = "linux")]
fn probe_freq_hz() -> Option<f64> {
    let cpuinfo = fs::read_to_string("/proc/cpuinfo").ok()?;
    parse_cpuinfo_mhz(&cpuinfo).map(|mhz| mhz * 1e6)
}

#[cfg(not(target_os = "linux"))]
fn probe_freq_hz() -> Option<f64> {
    None
}

#[cfg(target_os = "linux")]
fn probe_cache_bytes() -> Option<u64> {
    let size = fs::read_to_string("/sys/devices/system/cpu/cpu0/cache/index2/size").ok()?;
    parse_cache_size(size.trim())
}

#[cfg(not(target_os = "linux"))]
fn probe_cache_bytes() -> Option<u64> {
    None
}

/// First `cpu MHz` entry from a /proc/cpuinfo dump.
fn parse_cpuinfo_mhz(cpuinfo: &str) -> Option<f64> {
    for line in cpuinfo.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim() == "cpu MHz" {
            if let Ok(mhz) = value.trim().parse::<f64>() {
                return Some(mhz);
            }
        }
    }
    None
}

/// Sysfs cache sizes read like `512K` or `8192K`; plain byte counts also
/// appear on some kernels.
fn parse_cache_size(size: &str) -> Option<u64> {
    if let Some(kib) = size.strip_suffix(['K', 'k']) {
        return kib.trim().parse::<u64>().ok().map(|v| v * 1024);
    }
    if let Some(mib) = size.strip_suffix(['M', 'm']) {
        return mib.trim().parse::<u64>().ok().map(|v| v * 1024 * 1024);
    }
    size.parse::<u64>().ok()
}
