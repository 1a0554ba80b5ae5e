use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use loopmesh::prelude::*;

// n x n grid with jittered heights, finalized and compacted
fn bumpy_grid(n: u32, seed: u64) -> TriMesh {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut mesh = TriMesh::default();
    for j in 0..=n {
        for i in 0..=n {
            let z = rng.r#gen::<f32>() * 0.25;
            mesh.add_vertex([i as f32, j as f32, z]).unwrap();
        }
    }
    let at = |i: u32, j: u32| VertexId(j * (n + 1) + i);
    for j in 0..n {
        for i in 0..n {
            mesh.insert_triangle([at(i, j), at(i + 1, j), at(i + 1, j + 1)], None)
                .unwrap();
            mesh.insert_triangle([at(i, j), at(i + 1, j + 1), at(i, j + 1)], None)
                .unwrap();
        }
    }
    mesh.finalize_boundaries().unwrap();
    mesh.compact().unwrap();
    mesh
}

fn bench_subdivide(c: &mut Criterion) {
    let pool = WorkerPool::new(PoolConfig::default()).unwrap();
    let opts = SubdivideOptions::default();
    let mut group = c.benchmark_group("subdivide");
    group.sample_size(20);

    for &n in &[16u32, 64, 128] {
        let mesh = Arc::new(bumpy_grid(n, 42));
        let faces = mesh.face_count();
        group.bench_with_input(BenchmarkId::new("serial", faces), &mesh, |b, m| {
            b.iter(|| subdivide(m, &Serial, &opts).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("pool", faces), &mesh, |b, m| {
            b.iter(|| subdivide(m, &pool, &opts).unwrap())
        });
        #[cfg(feature = "rayon")]
        group.bench_with_input(BenchmarkId::new("rayon", faces), &mesh, |b, m| {
            b.iter(|| subdivide(m, &RayonExecutor, &opts).unwrap())
        });
    }
    group.finish();
}

fn bench_quadrangulate(c: &mut Criterion) {
    let mesh = bumpy_grid(64, 7);
    c.bench_function("quadrangulate 64x64", |b| b.iter(|| quadrangulate(&mesh)));
}

criterion_group!(benches, bench_subdivide, bench_quadrangulate);
criterion_main!(benches);
