//! Hierarchical clustering on PCA-reduced data.
//!
//! Procedure:
//! 1. Reduce the points with PCA, keeping the fewest components whose
//!    cumulative explained variance exceeds the threshold
//! 2. Build the agglomerative merge tree over the reduced points
//! 3. Pick the cutoff distance as a percentile of a per-merge statistic
//! 4. Cut the tree into flat clusters numbered `0..k`
//!
//! [`HierarchicalClustering::run`] additionally writes a dendrogram and an
//! embedding scatter colored by cluster.

use super::cutoff::CutoffPolicy;
use super::linkage::{DistanceMetric, LinkageMethod, MergeTree};
use crate::decomposition::{Pca, PcaConfig};
use crate::error::{KolosalError, Result};
use crate::utils::{ensure_finite, Timer};
use crate::visualization::dendrogram::{render_dendrogram, DendrogramLayout, DendrogramStyle};
use crate::visualization::projector::{validate_embedding, Projector};
use crate::visualization::scatter::{ensure_output_dir, ColorData, ScatterConfig, ScatterPlotter};
use crate::visualization::umap::Umap;
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Hierarchical clustering configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HierarchicalConfig {
    /// Dimensionality reduction before linkage
    pub pca: PcaConfig,
    pub linkage: LinkageMethod,
    pub metric: DistanceMetric,
    pub cutoff: CutoffPolicy,
    /// Scatter plot written by `run`
    pub scatter: ScatterConfig,
    /// Dendrogram written by `run`
    pub dendrogram: DendrogramStyle,
}

impl HierarchicalConfig {
    pub fn with_pca(mut self, pca: PcaConfig) -> Self {
        self.pca = pca;
        self
    }

    pub fn with_linkage(mut self, linkage: LinkageMethod) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_cutoff(mut self, cutoff: CutoffPolicy) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_scatter(mut self, scatter: ScatterConfig) -> Self {
        self.scatter = scatter;
        self
    }

    pub fn with_dendrogram(mut self, dendrogram: DendrogramStyle) -> Self {
        self.dendrogram = dendrogram;
        self
    }
}

/// Output of [`HierarchicalClustering::fit`]
#[derive(Debug, Clone)]
pub struct ClusteringResult {
    /// One label per input row, numbered `0..n_clusters` by first appearance
    pub labels: Array1<usize>,
    pub n_clusters: usize,
    /// Principal components kept
    pub n_components: usize,
    pub explained_variance_ratio: Array1<f64>,
    /// Cutoff distance used to cut the tree
    pub cutoff: f64,
    pub tree: MergeTree,
}

/// PCA + agglomerative clustering with an adaptive cutoff
#[derive(Debug, Clone)]
pub struct HierarchicalClustering<P = Umap> {
    config: HierarchicalConfig,
    projector: P,
}

impl HierarchicalClustering<Umap> {
    /// Clustering whose scatter plot uses the default UMAP layout
    pub fn new(config: HierarchicalConfig) -> Self {
        Self {
            config,
            projector: Umap::default(),
        }
    }
}

impl Default for HierarchicalClustering<Umap> {
    fn default() -> Self {
        Self::new(HierarchicalConfig::default())
    }
}

impl<P: Projector> HierarchicalClustering<P> {
    pub fn with_projector(config: HierarchicalConfig, projector: P) -> Self {
        Self { config, projector }
    }

    pub fn config(&self) -> &HierarchicalConfig {
        &self.config
    }

    /// Cluster the rows of `x`. Performs no I/O.
    pub fn fit(&self, x: ArrayView2<f64>) -> Result<ClusteringResult> {
        if x.nrows() < 2 {
            return Err(KolosalError::DataError(format!(
                "hierarchical clustering needs at least 2 rows, got {}",
                x.nrows()
            )));
        }
        ensure_finite(&x, "input")?;
        self.config.cutoff.validate()?;

        let timer = Timer::start("pca");
        let (model, reduced) = Pca::new(self.config.pca.clone()).fit_transform(x)?;
        timer.stop();
        info!(
            n_components = model.n_components(),
            n_features = x.ncols(),
            "PCs used for clustering"
        );

        let timer = Timer::start("linkage");
        let tree = MergeTree::build(reduced.view(), self.config.linkage, self.config.metric)?;
        timer.stop();

        let cutoff = self.config.cutoff.cutoff(&tree)?;
        info!(cutoff, percentile = self.config.cutoff.percentile, "cutoff distance");

        let labels = tree.cut(cutoff);
        let n_clusters = labels.iter().max().map_or(0, |&l| l + 1);
        info!(n_clusters, "clusters found");

        Ok(ClusteringResult {
            labels,
            n_clusters,
            n_components: model.n_components(),
            explained_variance_ratio: model.explained_variance_ratio().clone(),
            cutoff,
            tree,
        })
    }

    /// Cluster `x` and save two figures into `figdir`:
    /// `dendrogram_<savetitle>.svg` and `hierarchical_cluster_<savetitle>.png`.
    ///
    /// The scatter uses `embedding` when given; otherwise the projector runs
    /// on the input `x`, not the PCA-reduced points.
    pub fn run(
        &self,
        x: ArrayView2<f64>,
        title: &str,
        savetitle: &str,
        figdir: &Path,
        embedding: Option<ArrayView2<f64>>,
    ) -> Result<Array1<usize>> {
        ensure_output_dir(figdir)?;
        if let Some(embedding) = embedding {
            validate_embedding(embedding, x.nrows())?;
        }

        let result = self.fit(x)?;

        let layout = DendrogramLayout::new(&result.tree, result.cutoff);
        render_dendrogram(
            &layout,
            &format!("Dendrogram: {}", title),
            &figdir.join(format!("dendrogram_{}.svg", savetitle)),
            &self.config.dendrogram,
        )?;

        let plotter = ScatterPlotter::with_projector(self.config.scatter.clone(), &self.projector);
        plotter.plot(
            x,
            &format!("Hierarchical Clustering: {}", title),
            &format!("hierarchical_cluster_{}", savetitle),
            figdir,
            Some(&ColorData::from_labels(&result.labels)),
            embedding,
        )?;

        Ok(result.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::cutoff::MergeStatistic;
    use crate::visualization::projector::PcaProjector;
    use ndarray::{array, Array2};

    fn two_groups() -> Array2<f64> {
        array![
            [0.0, 0.0, 0.0],
            [0.1, 0.0, 0.05],
            [0.0, 0.1, 0.02],
            [10.0, 10.0, 10.0],
            [10.1, 10.0, 10.05],
            [10.0, 10.1, 9.98],
        ]
    }

    fn distance_config(percentile: f64) -> HierarchicalConfig {
        HierarchicalConfig::default().with_cutoff(
            CutoffPolicy::new(percentile).with_statistic(MergeStatistic::MergeDistance),
        )
    }

    #[test]
    fn test_defaults() {
        let config = HierarchicalConfig::default();
        assert_eq!(config.linkage, LinkageMethod::Ward);
        assert_eq!(config.metric, DistanceMetric::Euclidean);
        assert_eq!(config.cutoff.percentile, 99.5);
        assert_eq!(config.pca.variance_threshold, 0.95);
    }

    #[test]
    fn test_fit_two_groups() {
        let x = two_groups();
        let clustering = HierarchicalClustering::with_projector(distance_config(75.0), PcaProjector::default());
        let result = clustering.fit(x.view()).unwrap();

        assert_eq!(result.labels.to_vec(), vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(result.n_clusters, 2);
        assert_eq!(result.tree.n_observations(), 6);
        assert!(result.n_components >= 1);
        assert_eq!(result.explained_variance_ratio.len(), result.n_components);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let x = two_groups();
        let clustering = HierarchicalClustering::new(HierarchicalConfig::default());
        let a = clustering.fit(x.view()).unwrap();
        let b = clustering.fit(x.view()).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.cutoff, b.cutoff);
    }

    #[test]
    fn test_labels_are_contiguous() {
        let x = two_groups();
        let result = HierarchicalClustering::default().fit(x.view()).unwrap();
        assert_eq!(result.labels.len(), 6);
        assert_eq!(result.labels[0], 0);
        for k in 0..result.n_clusters {
            assert!(result.labels.iter().any(|&l| l == k));
        }
    }

    #[test]
    fn test_too_few_rows() {
        let x = array![[1.0, 2.0]];
        let err = HierarchicalClustering::default().fit(x.view()).unwrap_err();
        assert!(matches!(err, KolosalError::DataError(_)));
    }

    #[test]
    fn test_constant_data_fails_component_selection() {
        let x = Array2::from_elem((5, 3), 2.0);
        let err = HierarchicalClustering::default().fit(x.view()).unwrap_err();
        assert!(matches!(err, KolosalError::ComponentSelection { .. }));
    }

    #[test]
    fn test_invalid_percentile() {
        let x = two_groups();
        let clustering = HierarchicalClustering::new(
            HierarchicalConfig::default().with_cutoff(CutoffPolicy::new(120.0)),
        );
        let err = clustering.fit(x.view()).unwrap_err();
        assert!(matches!(err, KolosalError::InvalidParameter { .. }));
    }

    #[test]
    fn test_run_requires_existing_dir() {
        let x = two_groups();
        let err = HierarchicalClustering::default()
            .run(x.view(), "t", "t", Path::new("/no/such/figdir"), None)
            .unwrap_err();
        assert!(matches!(err, KolosalError::IoError(_)));
    }

    #[test]
    fn test_run_rejects_bad_embedding() {
        let x = two_groups();
        let dir = tempfile::tempdir().unwrap();
        let embedding = Array2::<f64>::zeros((5, 2));
        let err = HierarchicalClustering::default()
            .run(x.view(), "t", "t", dir.path(), Some(embedding.view()))
            .unwrap_err();
        assert!(matches!(err, KolosalError::ShapeError { .. }));
    }
}
