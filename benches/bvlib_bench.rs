use criterion::{Criterion, black_box, criterion_group, criterion_main};
use smt_jit::Bitvector;
use smt_jit::bvlib::array::BvArray;
use smt_jit::bvlib::context::Arena;

fn bench_scalar_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitvector_scalar_ops");

    let a = Bitvector::mk(32, 0xdead_beef);
    let b = Bitvector::mk(32, 0x1234_5678);

    group.bench_function("add", |bencher| {
        bencher.iter(|| Bitvector::add(black_box(a), black_box(b)));
    });
    group.bench_function("mul", |bencher| {
        bencher.iter(|| Bitvector::mul(black_box(a), black_box(b)));
    });
    group.bench_function("ult", |bencher| {
        bencher.iter(|| Bitvector::ult(black_box(a), black_box(b)));
    });
    group.bench_function("concat", |bencher| {
        bencher.iter(|| Bitvector::concat(black_box(a), black_box(b)));
    });

    group.finish();
}

fn bench_arena_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_bva_mk_init");

    for len in [8usize, 64, 512].iter() {
        let constants: Vec<u64> = (0..*len as u64).collect();
        group.bench_with_input(format!("len_{len}"), len, |bencher, _| {
            bencher.iter(|| {
                let mut arena = Arena::new();
                let arr: *mut BvArray = arena.bva_mk_init(8, constants.len() as u64, black_box(&constants));
                arr
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scalar_ops, bench_arena_allocation);
criterion_main!(benches);
