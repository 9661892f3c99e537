//! Benchmark suites and the harness drive loop.
//!
//! A suite groups test cases with one sweep and one output attribute; the
//! harness builds each case's executable through the artifact cache, runs
//! it once per zipped combination, and records the chosen attribute
//! against the (test, parameter tuple) key. Combinations execute in sweep
//! order here, but nothing may depend on that: the table is keyed, so the
//! mapping is order-independent.

use std::collections::BTreeMap;
use std::path::PathBuf;

use repro_build::{ArtifactCache, ExecutableId};
use repro_core::{ErrorInfo, Executor, Invocation, ReproError};
use repro_host::HardwareProfile;
use repro_perf::{CostModel, PeakInput};
use serde_json::{json, Value};

use crate::flags::flag_args;
use crate::parse::parse_output;
use crate::sweep::Sweep;
use crate::table::{ResultKey, ResultTable};

/// One benchmark test case backed by a buildable executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchCase {
    /// Test identity used in the result table.
    pub name: String,
    /// Project-relative path of the executable's source entry point.
    pub executable: PathBuf,
    /// Optional build-variant discriminator.
    pub variant: Option<String>,
    /// Extra build arguments, forwarded through the `ARGS=` convention.
    pub build_args: Option<String>,
}

impl BenchCase {
    /// Case with no variant and no extra build arguments.
    pub fn new(name: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            variant: None,
            build_args: None,
        }
    }

    /// Sets the build-variant discriminator.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Sets extra build arguments.
    pub fn with_build_args(mut self, args: impl Into<String>) -> Self {
        self.build_args = Some(args.into());
        self
    }

    fn id(&self) -> ExecutableId {
        ExecutableId {
            source: self.executable.clone(),
            variant: self.variant.clone(),
        }
    }
}

/// Which value a suite records per combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// A key reported directly by the executable (e.g. `%peak`).
    Reported(String),
    /// Fraction of theoretical peak, computed from the reported operation
    /// counts and measured `time` via the cost model.
    PeakFraction,
}

/// A named group of cases swept together.
#[derive(Debug, Clone)]
pub struct Suite {
    /// Cases executed for every combination.
    pub cases: Vec<BenchCase>,
    /// The parameter sweep.
    pub sweep: Sweep,
    /// Attribute recorded per combination.
    pub attribute: Attribute,
}

impl Suite {
    /// Creates a suite.
    pub fn new(cases: Vec<BenchCase>, sweep: Sweep, attribute: Attribute) -> Self {
        Self {
            cases,
            sweep,
            attribute,
        }
    }
}

/// Everything a harness run borrows from the surrounding pipeline.
pub struct RunContext<'a> {
    /// Artifact cache building the case executables.
    pub cache: &'a mut ArtifactCache,
    /// Executor running the built benchmarks.
    pub executor: &'a Executor,
    /// Cost model for computed attributes.
    pub model: &'a dyn CostModel,
    /// Characterized host, resolved before the run.
    pub profile: HardwareProfile,
}

/// Composes suites and collects their results.
#[derive(Debug, Default)]
pub struct Harness {
    name: String,
    suites: Vec<Suite>,
    table: ResultTable,
}

impl Harness {
    /// Creates an empty harness.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            suites: Vec::new(),
            table: ResultTable::new(),
        }
    }

    /// Harness name (used by reporting).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a suite.
    pub fn add_suite(&mut self, suite: Suite) {
        self.suites.push(suite);
    }

    /// Results recorded so far.
    pub fn table(&self) -> &ResultTable {
        &self.table
    }

    /// Runs every registered suite: builds each case once, executes it for
    /// every zipped combination, and records the suite's attribute.
    pub fn run(&mut self, ctx: &mut RunContext<'_>) -> Result<&ResultTable, ReproError> {
        for suite in &self.suites {
            let combinations = suite.sweep.combinations()?;
            for case in &suite.cases {
                let binary =
                    ctx.cache
                        .ensure_built(&case.id(), case.build_args.as_deref(), false)?;
                for combination in &combinations {
                    let invocation = Invocation::new(binary.display().to_string())
                        .args(flag_args(combination));
                    let output = ctx.executor.run_or_fail(&invocation)?;
                    let parsed = parse_output(&output.text_lossy());
                    let value =
                        resolve_attribute(&suite.attribute, &parsed, ctx.model, &ctx.profile)?;
                    self.table
                        .insert(ResultKey::new(&case.name, combination), value);
                }
            }
        }
        Ok(&self.table)
    }
}

fn resolve_attribute(
    attribute: &Attribute,
    parsed: &BTreeMap<String, Value>,
    model: &dyn CostModel,
    profile: &HardwareProfile,
) -> Result<Value, ReproError> {
    match attribute {
        Attribute::Reported(key) => parsed.get(key).cloned().ok_or_else(|| {
            ReproError::Parse(
                ErrorInfo::new(
                    "harness.missing_attribute",
                    format!("benchmark output did not report `{key}`"),
                )
                .with_context("attribute", key.clone())
                .with_context(
                    "reported_keys",
                    parsed.keys().cloned().collect::<Vec<_>>().join(","),
                ),
            )
        }),
        Attribute::PeakFraction => {
            let measured = parsed.get("time").and_then(Value::as_f64).ok_or_else(|| {
                ReproError::Parse(ErrorInfo::new(
                    "harness.missing_time",
                    "peak fraction needs a measured `time` in the output",
                ))
            })?;
            if measured <= 0.0 {
                return Err(ReproError::Parse(
                    ErrorInfo::new("harness.bad_time", "measured time must be positive")
                        .with_context("time", measured.to_string()),
                ));
            }
            let input = PeakInput::from_output(parsed, profile);
            let peak = model.peak_time(&input);
            Ok(json!(peak / measured))
        }
    }
}
