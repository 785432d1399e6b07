//! Benchmark for noise and sampler throughput.
//!
//! Run with: cargo bench --package strata_procedural --bench noise_benchmark

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use strata_procedural::{CellularNoise, Levels, Sampler, SimplexNoise, TerrainSampler, WorldSeed};

fn benchmark_single_sample(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42));

    c.bench_function("single_noise_sample", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(noise.sample(black_box(x), black_box(x * 0.7)))
        });
    });
}

fn benchmark_octaved_noise(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42));

    c.bench_function("fbm_4_octaves", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(noise.fbm(black_box(x), black_box(x * 0.7), 4, 0.5, 2.0))
        });
    });
}

fn benchmark_cellular(c: &mut Criterion) {
    let cells = CellularNoise::new(WorldSeed::new(42), 192.0, 0.8);

    c.bench_function("cellular_value", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 1.0;
            black_box(cells.value(black_box(x), black_box(x * 0.7)))
        });
    });
}

fn benchmark_terrain_sampler(c: &mut Criterion) {
    let seed = WorldSeed::new(42);
    let sampler = TerrainSampler::new(seed, &Levels::default());

    let mut group = c.benchmark_group("terrain_sampler");
    group.throughput(Throughput::Elements(64 * 64));
    group.bench_function("64x64_columns", |b| {
        b.iter(|| {
            for z in 0..64 {
                for x in 0..64 {
                    black_box(sampler.sample(seed, x, z).ok());
                }
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_sample,
    benchmark_octaved_noise,
    benchmark_cellular,
    benchmark_terrain_sampler
);
criterion_main!(benches);
