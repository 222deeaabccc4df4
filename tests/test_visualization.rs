//! Integration test: scatter dispatch, dendrogram layout and projectors

use kolosal_explore::clustering::{HierarchicalClustering, HierarchicalConfig};
use kolosal_explore::visualization::{
    ColorData, Colormap, DendrogramLayout, PanelLayout, PcaProjector, Projector, ScatterConfig,
    ScatterPlotter, Umap, UmapConfig,
};
use kolosal_explore::{KolosalError, Result};
use ndarray::{Array1, Array2, ArrayView2};
use std::cell::Cell;
use std::path::Path;

/// Counts calls and lays points out on the diagonal
#[derive(Default)]
struct CountingProjector {
    calls: Cell<usize>,
}

impl Projector for CountingProjector {
    fn project(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.calls.set(self.calls.get() + 1);
        Ok(Array2::from_shape_fn((x.nrows(), 2), |(i, _)| i as f64))
    }
}

fn embedding(n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, 2), |(i, j)| ((i * 31 + j * 17) % 97) as f64 / 9.7)
}

fn mixed_columns(n: usize, d: usize) -> ColorData {
    // Column 0 binary, the rest continuous
    let values = Array2::from_shape_fn((n, d), |(i, j)| {
        if j == 0 {
            (i % 2) as f64
        } else {
            (i * (j + 1)) as f64 * 0.37
        }
    });
    ColorData::new(values).with_labels((0..d).map(|j| format!("column {}", j)))
}

#[test]
fn test_subplot_count_per_dimensionality() {
    let plotter = ScatterPlotter::default();
    let e = embedding(50);

    let expected = [
        (1, PanelLayout::Single, 1, (6.0, 5.0)),
        (2, PanelLayout::Row, 2, (12.0, 5.0)),
        (3, PanelLayout::Grid, 3, (12.0, 10.0)),
        (4, PanelLayout::Grid, 4, (12.0, 10.0)),
    ];
    for (d, layout, panels, size) in expected {
        let color = mixed_columns(50, d);
        let fig = plotter.build_figure(e.view(), Some(&color), "dims").unwrap();
        assert_eq!(fig.layout, layout, "d = {}", d);
        assert_eq!(fig.panels.len(), panels, "d = {}", d);
        assert_eq!(fig.size_inches, size, "d = {}", d);
        assert_eq!(fig.blank_slots(), if d == 3 { 1 } else { 0 });
    }

    let plain = plotter.build_figure(e.view(), None, "plain").unwrap();
    assert_eq!(plain.panels.len(), 1);
    assert!(plain.panels[0].colorbar.is_none());
}

#[test]
fn test_five_columns_rejected_before_projection() {
    let dir = tempfile::tempdir().unwrap();
    let projector = CountingProjector::default();
    let plotter = ScatterPlotter::with_projector(ScatterConfig::default(), &projector);
    let x = Array2::from_shape_fn((30, 4), |(i, j)| (i + j) as f64);
    let color = ColorData::new(Array2::zeros((30, 5)));

    let err = plotter
        .plot(x.view(), "too many", "too_many", dir.path(), Some(&color), None)
        .unwrap_err();
    assert!(matches!(
        err,
        KolosalError::UnsupportedColorDimensionality { columns: 5, max: 4 }
    ));
    assert_eq!(projector.calls.get(), 0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_figdir_checked_first() {
    let projector = CountingProjector::default();
    let plotter = ScatterPlotter::with_projector(ScatterConfig::default(), &projector);
    let x = Array2::from_shape_fn((10, 3), |(i, j)| (i * j) as f64);

    let err = plotter
        .plot(x.view(), "t", "t", Path::new("/no/such/figures"), None, None)
        .unwrap_err();
    assert!(matches!(err, KolosalError::IoError(_)));
    assert_eq!(projector.calls.get(), 0);
}

#[test]
fn test_binary_and_continuous_dispatch() {
    let plotter = ScatterPlotter::default();
    let color = mixed_columns(40, 2);
    let fig = plotter.build_figure(embedding(40).view(), Some(&color), "kinds").unwrap();

    assert_eq!(fig.panels[0].coloring.colormap(), Some(Colormap::Coolwarm));
    assert_eq!(fig.panels[1].coloring.colormap(), Some(Colormap::Turbo));

    let binary_bar = fig.panels[0].colorbar.unwrap();
    assert!((binary_bar.norm.vmin + 0.1).abs() < 1e-12);
    assert!((binary_bar.norm.vmax - 1.1).abs() < 1e-12);
    assert_eq!(fig.panels[0].title.as_deref(), Some("column 0"));
}

#[test]
fn test_binary_threshold_is_configurable() {
    let plotter = ScatterPlotter::new(ScatterConfig::default().with_binary_max_unique(3));
    let column = ColorData::from_column(Array1::from_vec(vec![0.0, 1.0, 2.0, 1.0]));
    let fig = plotter.build_figure(embedding(4).view(), Some(&column), "three").unwrap();
    assert_eq!(fig.panels[0].coloring.colormap(), Some(Colormap::Coolwarm));
}

#[test]
fn test_marker_scale_by_point_count() {
    let plotter = ScatterPlotter::default();
    let cases = [(400, 8.0), (800, 4.0), (2000, 1.0), (4000, 0.5)];
    for (n, base) in cases {
        let e = embedding(n);
        let plain = plotter.build_figure(e.view(), None, "n").unwrap();
        assert_eq!(plain.marker_area, base, "n = {}", n);

        let one = ColorData::from_column(Array1::from_shape_fn(n, |i| i as f64));
        let single = plotter.build_figure(e.view(), Some(&one), "n").unwrap();
        assert_eq!(single.marker_area, base * 2.0, "n = {}", n);

        let four = mixed_columns(n, 4);
        let grid = plotter.build_figure(e.view(), Some(&four), "n").unwrap();
        assert_eq!(grid.marker_area, base * 4.0, "n = {}", n);
    }
}

#[test]
fn test_cluster_labels_as_color() {
    let labels = Array1::from_vec(vec![0usize, 0, 1, 2, 2, 1]);
    let color = ColorData::from_labels(&labels);
    assert_eq!(color.n_columns(), 1);
    assert_eq!(color.values()[[3, 0]], 2.0);

    let fig = ScatterPlotter::default()
        .build_figure(embedding(6).view(), Some(&color), "labels")
        .unwrap();
    assert_eq!(fig.panels[0].coloring.colormap(), Some(Colormap::Turbo));
    assert!(fig.panels[0].colorbar.unwrap().ticks);
}

#[test]
fn test_dendrogram_layout_matches_clustering() {
    let x = Array2::from_shape_fn((12, 3), |(i, j)| {
        let base = if i < 6 { 0.0 } else { 20.0 };
        base + ((i * 7 + j * 3) % 5) as f64 * 0.1
    });
    let clustering =
        HierarchicalClustering::with_projector(HierarchicalConfig::default(), PcaProjector::default());
    let result = clustering.fit(x.view()).unwrap();
    let layout = DendrogramLayout::new(&result.tree, result.cutoff);

    let mut order = layout.leaf_order().to_vec();
    order.sort_unstable();
    assert_eq!(order, (0..12).collect::<Vec<_>>());
    assert_eq!(layout.links().len(), 11);
    assert!(layout.links().last().unwrap().subtree.is_none());

    let singletons = (0..result.n_clusters)
        .filter(|&k| result.labels.iter().filter(|&&l| l == k).count() == 1)
        .count();
    assert_eq!(layout.n_colored_subtrees(), result.n_clusters - singletons);
}

#[test]
fn test_umap_projector_is_deterministic() {
    let x = Array2::from_shape_fn((40, 4), |(i, j)| {
        let base = if i < 20 { 0.0 } else { 6.0 };
        base + ((i * 13 + j * 7) % 11) as f64 * 0.05
    });
    let umap = Umap::new(UmapConfig::default().with_n_neighbors(5).with_n_epochs(50));
    let a = umap.project(x.view()).unwrap();
    let b = umap.project(x.view()).unwrap();
    assert_eq!(a.dim(), (40, 2));
    assert_eq!(a, b);
}
