//! Mutable-set payload construction benchmarks (spec §4.6).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use refpersys_core::object::Runtime;
use refpersys_payload::MutableSetPayload;

fn bench_set_construction(c: &mut Criterion) {
    let sizes: &[usize] = &[8, 64, 512, 4096];
    let mut group = c.benchmark_group("mutable_set_construction");

    for &size in sizes {
        let rt = Runtime::new();
        let members: Vec<_> = (0..size).map(|_| rt.create_object()).collect();

        group.bench_with_input(BenchmarkId::new("add", size), &size, |b, _| {
            b.iter(|| {
                let set = MutableSetPayload::new();
                for member in &members {
                    set.add(member.clone());
                }
                black_box(set.cardinal());
            });
        });
    }
    group.finish();
}

fn bench_set_contains(c: &mut Criterion) {
    let rt = Runtime::new();
    let members: Vec<_> = (0..4096).map(|_| rt.create_object()).collect();
    let set = MutableSetPayload::new();
    for member in &members {
        set.add(member.clone());
    }
    let probe = members[2048].clone();

    c.bench_function("mutable_set_contains_hit", |b| {
        b.iter(|| black_box(set.contains(&probe)));
    });
}

criterion_group!(benches, bench_set_construction, bench_set_contains);
criterion_main!(benches);
