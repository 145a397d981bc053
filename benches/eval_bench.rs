use std::io::Write;

use criterion::{Criterion, criterion_group, criterion_main};
use smt_jit::jit::{DriverConfig, run_file};

const SOURCE: &str = r#"(declare-fun arg00 () (Array (_ BitVec 32) (_ BitVec 8)))
(assert (= (_ bv115 8) (select arg00 (_ bv5 32))))
; { "arg00": [0,0,0,0,0,115,0,0] }
; { "arg00": [0,0,0,0,0,0,0,0] }
"#;

fn bench_run_file(c: &mut Criterion) {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(SOURCE.as_bytes()).expect("write temp file");

    let mut group = c.benchmark_group("run_file");

    group.bench_function("optimized", |bencher| {
        let config = DriverConfig::default();
        bencher.iter(|| run_file(file.path(), &config).unwrap());
    });

    group.bench_function("no_opt", |bencher| {
        let config = DriverConfig { no_opt: true, ..DriverConfig::default() };
        bencher.iter(|| run_file(file.path(), &config).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_run_file);
criterion_main!(benches);
