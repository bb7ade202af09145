//! Object identifier codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use refpersys_core::oid::Oid;

fn sample_oids(n: u64) -> Vec<Oid> {
    (0..n).map(|i| Oid::new(10_000_000 + i, 1_000_000 + i).unwrap()).collect()
}

fn bench_encode(c: &mut Criterion) {
    let oids = sample_oids(1024);
    c.bench_function("oid_encode", |b| {
        b.iter(|| {
            for oid in &oids {
                black_box(oid.encode());
            }
        });
    });
}

fn bench_decode(c: &mut Criterion) {
    let texts: Vec<String> = sample_oids(1024).iter().map(|o| o.encode()).collect();
    c.bench_function("oid_decode", |b| {
        b.iter(|| {
            for text in &texts {
                black_box(Oid::decode(text).unwrap());
            }
        });
    });
}

fn bench_hash_and_bucket(c: &mut Criterion) {
    let oids = sample_oids(1024);
    let mut group = c.benchmark_group("oid_hash");
    group.bench_with_input(BenchmarkId::new("hash32", oids.len()), &oids, |b, oids| {
        b.iter(|| {
            for oid in oids {
                black_box(oid.hash32());
            }
        });
    });
    group.bench_with_input(BenchmarkId::new("bucket", oids.len()), &oids, |b, oids| {
        b.iter(|| {
            for oid in oids {
                black_box(oid.bucket());
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_hash_and_bucket);
criterion_main!(benches);
