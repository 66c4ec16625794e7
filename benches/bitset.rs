use criterion::*;

use ecs_substrate::{kernels_for, FixedBitSet256, Tier};

fn bitset_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("FixedBitSet256");
    let dense = FixedBitSet256::many(&[1, 17, 50, 64, 100, 129, 200, 255]);
    let sparse = FixedBitSet256::many(&[50, 128, 254]);

    for tier in [Tier::Wide, Tier::Half, Tier::Scalar] {
        let kernels = match kernels_for(tier) {
            Ok(kernels) => kernels,
            Err(_) => continue,
        };

        group.bench_function(BenchmarkId::new("has_all", tier.to_string()), |b| {
            b.iter(|| (kernels.has_all)(black_box(&dense), black_box(&sparse)))
        });
        group.bench_function(BenchmarkId::new("has_any", tier.to_string()), |b| {
            b.iter(|| (kernels.has_any)(black_box(&dense), black_box(&sparse)))
        });
        group.bench_function(BenchmarkId::new("equals", tier.to_string()), |b| {
            b.iter(|| (kernels.equals)(black_box(&dense), black_box(&dense)))
        });
        group.bench_function(BenchmarkId::new("add", tier.to_string()), |b| {
            b.iter(|| {
                let mut target = dense;
                (kernels.add)(&mut target, black_box(&sparse));
                target
            })
        });
        group.bench_function(BenchmarkId::new("invert", tier.to_string()), |b| {
            b.iter(|| {
                let mut target = dense;
                (kernels.invert)(&mut target);
                target
            })
        });
    }

    group.bench_function("hash32", |b| b.iter(|| black_box(&dense).hash32()));
    group.finish();
}

criterion_group!(benches, bitset_ops);
criterion_main!(benches);
