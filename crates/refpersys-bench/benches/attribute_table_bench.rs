//! Attribute table `put`/`find` benchmarks (spec §4.3, copy-on-write
//! immutable attribute table replacement on every mutation).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use refpersys_core::object::Runtime;
use refpersys_core::value::Value;

fn bench_put_attribute(c: &mut Criterion) {
    let sizes: &[usize] = &[4, 16, 64, 256];
    let mut group = c.benchmark_group("attribute_put");

    for &size in sizes {
        let rt = Runtime::new();
        let obj = rt.create_object();
        let attrs: Vec<_> = (0..size).map(|_| rt.create_object()).collect();

        group.bench_with_input(BenchmarkId::new("sequential", size), &size, |b, _| {
            b.iter(|| {
                for attr in &attrs {
                    rt.put_attribute(&obj, attr.clone(), Value::Int(1));
                }
            });
        });
    }
    group.finish();
}

fn bench_get_attribute(c: &mut Criterion) {
    let sizes: &[usize] = &[4, 16, 64, 256];
    let mut group = c.benchmark_group("attribute_find");

    for &size in sizes {
        let rt = Runtime::new();
        let obj = rt.create_object();
        let attrs: Vec<_> = (0..size).map(|_| rt.create_object()).collect();
        for attr in &attrs {
            rt.put_attribute(&obj, attr.clone(), Value::Int(1));
        }

        group.bench_with_input(BenchmarkId::new("hit_last", size), &size, |b, _| {
            b.iter(|| {
                black_box(rt.get_attribute(&obj, attrs.last().unwrap()));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_put_attribute, bench_get_attribute);
criterion_main!(benches);
