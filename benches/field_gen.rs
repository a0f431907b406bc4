//! Benchmarks for field sampling, uniform packing and the headless frame loop.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crystalfx::config::FieldConfig;
use crystalfx::field::{generator, FieldInstance};
use crystalfx::prelude::*;

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_generate");

    for count in [500usize, 2_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut rng = SmallRng::seed_from_u64(7);
            b.iter(|| black_box(generator::generate(count, &mut rng)))
        });
    }

    group.finish();
}

fn bench_reset(c: &mut Criterion) {
    let mut scene = Scene::new();
    let mut rng = SmallRng::seed_from_u64(7);
    let mut field = FieldInstance::with_rng(&mut scene, FieldConfig::default(), 2_000, &mut rng);

    c.bench_function("field_reset_2000", |b| {
        b.iter(|| field.reset_with_rng(&mut scene, &mut rng))
    });
}

fn bench_uniform_bytes(c: &mut Criterion) {
    let mut scene = Scene::new();
    let mut rng = SmallRng::seed_from_u64(7);
    let field = FieldInstance::with_rng(&mut scene, FieldConfig::default(), 16, &mut rng);
    let uniforms = &scene.material(field.material()).as_shader().unwrap().uniforms;

    c.bench_function("field_uniform_bytes", |b| b.iter(|| black_box(uniforms.to_bytes())));
}

fn bench_frame_loop(c: &mut Criterion) {
    let sizes = Sizes::new(1280, 720, 1.0);
    let renderer = HeadlessRenderer::new(sizes.width, sizes.height, sizes.pixel_ratio);
    let mut experience = Experience::new(SceneConfig::default(), Box::new(renderer), sizes).unwrap();
    experience.step(16.0).unwrap();
    experience.reveal();

    c.bench_function("experience_step", |b| {
        b.iter(|| experience.step(black_box(16.0)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_generate,
    bench_reset,
    bench_uniform_bytes,
    bench_frame_loop,
);
criterion_main!(benches);
