//! Build-artifact cache keyed by executable identity.
//!
//! The cache guarantees at most one external build per identity per process
//! lifetime unless a rebuild is forced, and memoizes the build tool's
//! per-directory build-output answers so the bridge is consulted once per
//! source directory.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use repro_core::{ErrorInfo, Executor, Invocation, ReproError};
use serde::{Deserialize, Serialize};

use crate::bridge::MakeBridge;

/// Identity of a requestable build artifact: the project-relative path to
/// its source entry point plus an optional variant discriminator. Two
/// identical identities resolve to the same cached artifact unless a
/// rebuild is explicitly forced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutableId {
    /// Path of the executable's source entry point, relative to the
    /// project root.
    pub source: PathBuf,
    /// Optional discriminator letting multiple builds of the same source
    /// coexist as distinct cached binaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl ExecutableId {
    /// Identity without a variant discriminator.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            variant: None,
        }
    }

    /// Identity carrying a variant discriminator.
    pub fn with_variant(source: impl Into<PathBuf>, variant: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            variant: Some(variant.into()),
        }
    }
}

/// Process-lifetime cache mapping executable identities to built binaries.
///
/// Exclusively owns its index; callers receive paths, never mutable
/// handles. All methods take `&mut self`, so the at-most-one-build
/// guarantee and the build-then-copy sequence for variants are serialized
/// by construction. A future parallel sweep executor must keep a
/// per-source-directory mutual-exclusion discipline around `ensure_built`.
#[derive(Debug)]
pub struct ArtifactCache {
    bridge: MakeBridge,
    top: PathBuf,
    built: BTreeMap<ExecutableId, PathBuf>,
    build_dirs: BTreeMap<PathBuf, PathBuf>,
}

impl ArtifactCache {
    /// Creates a cache rooted at the project root resolved from
    /// `start_dir` via the bridge's `top` query.
    pub fn new(bridge: MakeBridge, start_dir: &Path) -> Result<Self, ReproError> {
        // Realpath the root once so later containment tests compare
        // consistently normalized paths.
        let top = normalized(&bridge.project_root(start_dir)?);
        Ok(Self {
            bridge,
            top,
            built: BTreeMap::new(),
            build_dirs: BTreeMap::new(),
        })
    }

    /// The resolved project root.
    pub fn top(&self) -> &Path {
        &self.top
    }

    /// Number of identities currently cached.
    pub fn len(&self) -> usize {
        self.built.len()
    }

    /// True when no identity has been built yet.
    pub fn is_empty(&self) -> bool {
        self.built.is_empty()
    }

    /// Ensures a built binary exists for `id` and returns its path.
    ///
    /// A cached identity is returned immediately unless `force` is set.
    /// `build_args` is forwarded to the build tool through the `ARGS=`
    /// convention. Fails with [`ReproError::Build`] when the expected
    /// output is missing after the tool reports success.
    pub fn ensure_built(
        &mut self,
        id: &ExecutableId,
        build_args: Option<&str>,
        force: bool,
    ) -> Result<PathBuf, ReproError> {
        if !force {
            if let Some(path) = self.built.get(id) {
                return Ok(path.clone());
            }
        }

        let name = id
            .source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                ReproError::Build(
                    ErrorInfo::new("cache.bad_identity", "identity has no executable name")
                        .with_context("source", id.source.display().to_string()),
                )
            })?;
        let source_dir = match id.source.parent() {
            Some(parent) => self.top.join(parent),
            None => self.top.clone(),
        };
        let build_dir = self.build_dir_for(&source_dir)?;

        let unqualified = build_dir.join(&name);
        let artifact = match &id.variant {
            Some(variant) => build_dir.join(variant_name(&name, variant)),
            None => unqualified.clone(),
        };

        if !artifact.is_file() || force {
            remove_stale(&unqualified)?;
            self.invoke_build(&unqualified, build_args)?;
            if !unqualified.is_file() {
                return Err(ReproError::Build(
                    ErrorInfo::new("cache.build_missing", "build produced no output")
                        .with_context("target", unqualified.display().to_string())
                        .with_context("source", id.source.display().to_string()),
                ));
            }
            if id.variant.is_some() {
                fs::copy(&unqualified, &artifact).map_err(|err| {
                    ReproError::Io(
                        ErrorInfo::new("cache.copy", err.to_string())
                            .with_context("from", unqualified.display().to_string())
                            .with_context("to", artifact.display().to_string()),
                    )
                })?;
                if !artifact.is_file() {
                    return Err(ReproError::Build(
                        ErrorInfo::new("cache.variant_missing", "variant copy produced no output")
                            .with_context("target", artifact.display().to_string()),
                    ));
                }
            }
        }

        self.built.insert(id.clone(), artifact.clone());
        Ok(artifact)
    }

    /// Runs the build tool's clean target for `dir` (relative to the
    /// project root) and evicts every cached identity and memoized
    /// build-directory binding inside that subtree.
    pub fn invalidate_subtree(&mut self, dir: &Path) -> Result<(), ReproError> {
        let clean_dir = self.top.join(dir);
        let invocation = Invocation::new(self.bridge.program())
            .arg("clean")
            .current_dir(&clean_dir);
        self.executor().run_or_fail(&invocation)?;

        let root = normalized(&clean_dir);
        let top = self.top.clone();
        self.built
            .retain(|id, _| !in_directory(&normalized(&top.join(&id.source)), &root));
        self.build_dirs
            .retain(|source_dir, _| !in_directory(&normalized(source_dir), &root));
        Ok(())
    }

    fn executor(&self) -> &Executor {
        self.bridge.executor()
    }

    fn build_dir_for(&mut self, source_dir: &Path) -> Result<PathBuf, ReproError> {
        if let Some(dir) = self.build_dirs.get(source_dir) {
            return Ok(dir.clone());
        }
        let dir = self.bridge.build_directory(source_dir)?;
        self.build_dirs.insert(source_dir.to_path_buf(), dir.clone());
        Ok(dir)
    }

    fn invoke_build(&self, target: &Path, build_args: Option<&str>) -> Result<(), ReproError> {
        let jobs = std::thread::available_parallelism()
            .map(std::num::NonZero::get)
            .unwrap_or(1);
        let mut invocation = Invocation::new(self.bridge.program())
            .arg("-j")
            .arg(jobs.to_string())
            .arg(target.display().to_string())
            .current_dir(&self.top);
        if let Some(args) = build_args {
            invocation = invocation.arg(format!("ARGS={args}"));
        }
        self.executor().run_or_fail(&invocation)?;
        Ok(())
    }
}

/// Variant-qualified artifact name: `stem__variant.ext`, or `stem__variant`
/// when the name has no extension. Variants of one source coexist in the
/// same build directory without collision.
pub fn variant_name(name: &str, variant: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}__{variant}.{ext}"),
        _ => format!("{name}__{variant}"),
    }
}

fn remove_stale(path: &Path) -> Result<(), ReproError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(ReproError::Io(
            ErrorInfo::new("cache.remove_stale", err.to_string())
                .with_context("path", path.display().to_string()),
        )),
    }
}

/// Realpath-normalizes when the path exists, otherwise keeps it as given.
fn normalized(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Component-wise containment: `path` lies inside `directory` (or is the
/// directory itself).
fn in_directory(path: &Path, directory: &Path) -> bool {
    path.starts_with(directory)
}
