use criterion::{criterion_group, criterion_main, Criterion};
use repro_bench::{ParamGroup, Sweep};
use serde_json::json;

fn make_sweep() -> Sweep {
    let n: Vec<_> = (0..256).map(|i| json!(1024 * (i + 1))).collect();
    let fold: Vec<_> = (0..256).map(|i| json!(1 + i % 8)).collect();
    let inc: Vec<_> = (0..256).map(|i| json!([1 + i % 4, 1])).collect();
    Sweep {
        params: vec![
            ParamGroup::single("N"),
            ParamGroup::single("fold"),
            ParamGroup::group(["incx", "incy"]),
        ],
        ranges: vec![n, fold, inc],
    }
}

fn bench_sweep(c: &mut Criterion) {
    let sweep = make_sweep();
    c.bench_function("sweep_combinations", |b| {
        b.iter(|| {
            let combos = sweep.combinations().expect("combinations");
            assert_eq!(combos.len(), 256);
        });
    });
    c.bench_function("sweep_plan_hash", |b| {
        b.iter(|| {
            let _ = sweep.stable_hash().expect("hash");
        });
    });
}

criterion_group!(benches, bench_sweep);
criterion_main!(benches);
