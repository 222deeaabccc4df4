use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kolosal_explore::clustering::{DistanceMetric, HierarchicalClustering, LinkageMethod, MergeTree};
use kolosal_explore::decomposition::{Pca, PcaConfig};
use kolosal_explore::visualization::{PcaProjector, Projector, Umap, UmapConfig};
use ndarray::Array2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_blob_data(n_rows: usize, n_features: usize) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    Array2::from_shape_fn((n_rows, n_features), |(i, _)| {
        let center = if i % 3 == 0 { -5.0 } else if i % 3 == 1 { 0.0 } else { 5.0 };
        center + rng.gen::<f64>() - 0.5
    })
}

fn bench_pca(c: &mut Criterion) {
    let mut group = c.benchmark_group("pca");

    for n_rows in [500, 2000, 5000].iter() {
        let x = create_blob_data(*n_rows, 20);

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &x, |b, x| {
            b.iter(|| Pca::new(PcaConfig::default()).fit(black_box(x.view())).unwrap())
        });
    }

    group.finish();
}

fn bench_linkage(c: &mut Criterion) {
    let mut group = c.benchmark_group("linkage");
    group.sample_size(10);

    for n_rows in [500, 1000, 2000].iter() {
        let x = create_blob_data(*n_rows, 5);

        group.bench_with_input(BenchmarkId::new("ward", n_rows), &x, |b, x| {
            b.iter(|| {
                MergeTree::build(black_box(x.view()), LinkageMethod::Ward, DistanceMetric::Euclidean)
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchical");
    group.sample_size(10);

    for n_rows in [500, 2000].iter() {
        let x = create_blob_data(*n_rows, 10);
        let clustering = HierarchicalClustering::default();

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &x, |b, x| {
            b.iter(|| clustering.fit(black_box(x.view())).unwrap())
        });
    }

    group.finish();
}

fn bench_projectors(c: &mut Criterion) {
    let mut group = c.benchmark_group("projector");
    group.sample_size(10);

    let x = create_blob_data(1000, 10);
    let umap = Umap::new(UmapConfig::default().with_n_epochs(100));
    let pca = PcaProjector::default();

    group.bench_function("umap_1000", |b| b.iter(|| umap.project(black_box(x.view())).unwrap()));
    group.bench_function("pca_1000", |b| b.iter(|| pca.project(black_box(x.view())).unwrap()));

    group.finish();
}

criterion_group!(benches, bench_pca, bench_linkage, bench_fit, bench_projectors);
criterion_main!(benches);
