//! Full pipeline: harness → artifact cache → scripted build tool →
//! scripted benchmark executables → result table.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use repro_bench::{Attribute, BenchCase, Harness, ResultKey, RunContext, Suite, Sweep};
use repro_build::{ArtifactCache, MakeBridge};
use repro_core::Executor;
use repro_host::HardwareProfile;
use repro_perf::ReferenceCostModel;
use serde_json::json;
use tempfile::TempDir;

/// Scripted build tool whose "built" executables echo their argument count
/// and a fixed operation-count record.
fn fake_project() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let top = dir.path();
    fs::create_dir_all(top.join("build")).expect("build dir");
    fs::create_dir_all(top.join("tests/benchs")).expect("source dir");
    let make = top.join("fake-make");
    let script = format!(
        r#"#!/bin/sh
TOP="{top}"
case "$1" in
  top) echo "$TOP" ;;
  pbd) echo "$TOP/build" ;;
  clean) rm -f "$TOP"/build/* ;;
  -j)
    target="$3"
    cat > "$target" <<'BENCH'
#!/bin/sh
echo "Benchmark [fake]"
echo "nargs: $#"
echo "d_add: 1000"
echo "time: 0.000002"
echo "%peak: 42.5"
BENCH
    chmod +x "$target"
    ;;
esac
"#,
        top = top.display(),
    );
    fs::write(&make, script).expect("write fake make");
    fs::set_permissions(&make, fs::Permissions::from_mode(0o755)).expect("chmod");
    (dir, make)
}

fn profile() -> HardwareProfile {
    HardwareProfile {
        vectorization: "SCALAR".to_string(),
        freq_hz: 1e9,
        fma: true,
        cache_bytes: 262_144,
    }
}

fn run_with_attribute(attribute: Attribute) -> (Harness, Sweep) {
    let (dir, make) = fake_project();
    let bridge = MakeBridge::with_program(make.display().to_string(), Executor::new());
    let mut cache = ArtifactCache::new(bridge, dir.path()).expect("cache");
    let executor = Executor::new();
    let model = ReferenceCostModel;
    let sweep = Sweep::new(
        ["N", "fold"],
        vec![vec![json!(4096), json!(8192)], vec![json!(1), json!(2)]],
    );
    let mut harness = Harness::new("bench");
    harness.add_suite(Suite::new(
        vec![BenchCase::new("rddot", "tests/benchs/bench_rddot")],
        sweep.clone(),
        attribute,
    ));
    let mut ctx = RunContext {
        cache: &mut cache,
        executor: &executor,
        model: &model,
        profile: profile(),
    };
    harness.run(&mut ctx).expect("run");
    (harness, sweep)
}

#[test]
fn reported_attribute_lands_per_combination() {
    let (harness, _) = run_with_attribute(Attribute::Reported("%peak".to_string()));
    let table = harness.table();
    // Two zipped combinations, never four.
    assert_eq!(table.len(), 2);
    let key = ResultKey::new(
        "rddot",
        &[("N".to_string(), json!(4096)), ("fold".to_string(), json!(1))],
    );
    assert_eq!(table.get(&key), Some(&json!(42.5)));
    let other = ResultKey::new(
        "rddot",
        &[("N".to_string(), json!(8192)), ("fold".to_string(), json!(2))],
    );
    assert_eq!(table.get(&other), Some(&json!(42.5)));
}

#[test]
fn parameters_reach_the_executable_as_flags() {
    let (harness, _) = run_with_attribute(Attribute::Reported("nargs".to_string()));
    // -N <value> --fold <value> is four argv entries.
    for (_, value) in harness.table().iter() {
        assert_eq!(value, &json!(4));
    }
}

#[test]
fn peak_fraction_uses_the_cost_model() {
    let (harness, _) = run_with_attribute(Attribute::PeakFraction);
    // 1000 scalar double adds at 1 GHz → 1 µs peak; measured 2 µs → 0.5.
    for (_, value) in harness.table().iter() {
        let fraction = value.as_f64().expect("fraction");
        assert!((fraction - 0.5).abs() < 1e-9);
    }
}

#[test]
fn results_export_with_the_plan_hash() {
    let (harness, sweep) = run_with_attribute(Attribute::Reported("%peak".to_string()));
    let out = tempfile::tempdir().expect("tempdir");
    let csv_path = out.path().join("bench.csv");
    let plan_hash = sweep.stable_hash().expect("hash");
    harness
        .table()
        .write_csv(&csv_path, &plan_hash)
        .expect("export");
    let contents = fs::read_to_string(&csv_path).expect("read");
    assert!(contents.starts_with("plan_hash,test,params,value"));
    assert!(contents.contains(&plan_hash));
    assert!(contents.contains("rddot,N=4096 fold=1,42.5"));
}
