//! Agglomerative merge trees.
//!
//! The tree is built by [kodama](https://docs.rs/kodama) from a condensed
//! pairwise distance matrix and stored with SciPy's id convention:
//! leaves are `0..n`, and merge `i` creates cluster id `n + i`.

use crate::error::{KolosalError, Result};
use kodama::{linkage as kodama_linkage, Method as KodamaMethod};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Linkage method: how the distance between two clusters is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkageMethod {
    /// Minimum distance between members
    Single,
    /// Maximum distance between members
    Complete,
    /// Mean distance between members (UPGMA)
    Average,
    /// WPGMA
    Weighted,
    /// Minimum increase of within-cluster variance
    #[default]
    Ward,
    /// Distance between centroids
    Centroid,
    /// Distance between medians (WPGMC)
    Median,
}

impl LinkageMethod {
    /// Methods whose update formula is only valid for Euclidean input.
    pub fn requires_euclidean(self) -> bool {
        matches!(
            self,
            LinkageMethod::Ward | LinkageMethod::Centroid | LinkageMethod::Median
        )
    }

    fn to_kodama(self) -> KodamaMethod {
        match self {
            LinkageMethod::Single => KodamaMethod::Single,
            LinkageMethod::Complete => KodamaMethod::Complete,
            LinkageMethod::Average => KodamaMethod::Average,
            LinkageMethod::Weighted => KodamaMethod::Weighted,
            LinkageMethod::Ward => KodamaMethod::Ward,
            LinkageMethod::Centroid => KodamaMethod::Centroid,
            LinkageMethod::Median => KodamaMethod::Median,
        }
    }
}

/// Pairwise distance between observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    SquaredEuclidean,
    /// City block / L1
    Manhattan,
    /// L-infinity
    Chebyshev,
    /// `1 - cos(angle)`
    Cosine,
}

impl DistanceMetric {
    pub fn distance(self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let pairs = a.iter().zip(b.iter());
        match self {
            DistanceMetric::Euclidean => pairs.map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt(),
            DistanceMetric::SquaredEuclidean => pairs.map(|(x, y)| (x - y).powi(2)).sum(),
            DistanceMetric::Manhattan => pairs.map(|(x, y)| (x - y).abs()).sum(),
            DistanceMetric::Chebyshev => pairs.map(|(x, y)| (x - y).abs()).fold(0.0, f64::max),
            DistanceMetric::Cosine => {
                let dot = a.dot(&b);
                let norm = (a.dot(&a) * b.dot(&b)).sqrt();
                // Zero vectors give NaN and are rejected by the caller
                1.0 - dot / norm
            }
        }
    }
}

/// One agglomeration step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// Id of the first merged cluster
    pub left: usize,
    /// Id of the second merged cluster
    pub right: usize,
    /// Linkage distance at which the two were joined
    pub distance: f64,
    /// Number of observations in the new cluster
    pub size: usize,
}

/// A complete binary merge hierarchy over `n_observations` points.
#[derive(Debug, Clone)]
pub struct MergeTree {
    n_observations: usize,
    merges: Vec<Merge>,
}

impl MergeTree {
    /// Build the tree over the rows of `points`.
    pub fn build(
        points: ArrayView2<f64>,
        method: LinkageMethod,
        metric: DistanceMetric,
    ) -> Result<Self> {
        let n = points.nrows();
        if n < 2 {
            return Err(KolosalError::DegenerateLinkage(format!(
                "at least 2 observations are required, got {}",
                n
            )));
        }
        if method.requires_euclidean() && metric != DistanceMetric::Euclidean {
            return Err(KolosalError::invalid_parameter(
                "metric",
                format!("{:?}", metric),
                &format!("{:?} linkage requires the Euclidean metric", method),
            ));
        }

        // Condensed dissimilarity matrix (upper triangle, row-major),
        // length n choose 2.
        let mut condensed: Vec<f64> = (0..n - 1)
            .into_par_iter()
            .flat_map_iter(|row| {
                (row + 1..n).map(move |col| metric.distance(points.row(row), points.row(col)))
            })
            .collect();

        if let Some(pos) = condensed.iter().position(|d| !d.is_finite()) {
            return Err(KolosalError::DegenerateLinkage(format!(
                "non-finite pairwise distance at condensed index {}",
                pos
            )));
        }

        let dendrogram = kodama_linkage(&mut condensed, n, method.to_kodama());
        let merges = dendrogram
            .steps()
            .iter()
            .map(|step| Merge {
                left: step.cluster1,
                right: step.cluster2,
                distance: step.dissimilarity,
                size: step.size,
            })
            .collect();

        Self::from_merges(n, merges)
    }

    /// Assemble a tree from explicit merge records, checking that every merge
    /// joins two clusters that already exist and are not yet merged.
    pub fn from_merges(n_observations: usize, merges: Vec<Merge>) -> Result<Self> {
        if n_observations < 2 {
            return Err(KolosalError::DegenerateLinkage(format!(
                "at least 2 observations are required, got {}",
                n_observations
            )));
        }
        if merges.len() != n_observations - 1 {
            return Err(KolosalError::DegenerateLinkage(format!(
                "expected {} merges for {} observations, got {}",
                n_observations - 1,
                n_observations,
                merges.len()
            )));
        }

        let mut consumed = vec![false; 2 * n_observations - 1];
        for (i, m) in merges.iter().enumerate() {
            let next_id = n_observations + i;
            for id in [m.left, m.right] {
                if id >= next_id || consumed[id] {
                    return Err(KolosalError::DegenerateLinkage(format!(
                        "merge {} references unavailable cluster {}",
                        i, id
                    )));
                }
                consumed[id] = true;
            }
            if m.left == m.right {
                return Err(KolosalError::DegenerateLinkage(format!(
                    "merge {} joins cluster {} with itself",
                    i, m.left
                )));
            }
            if !m.distance.is_finite() {
                return Err(KolosalError::DegenerateLinkage(format!(
                    "merge {} has non-finite distance {}",
                    i, m.distance
                )));
            }
        }

        Ok(Self {
            n_observations,
            merges,
        })
    }

    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Id of the cluster holding every observation
    pub fn root(&self) -> usize {
        2 * self.n_observations - 2
    }

    pub fn max_distance(&self) -> f64 {
        self.merges.iter().map(|m| m.distance).fold(0.0, f64::max)
    }

    /// For every merge, the largest merge distance anywhere in its subtree.
    ///
    /// Equal to the merge's own distance for monotone trees; centroid and
    /// median linkage can produce inversions where a child sits higher.
    pub fn subtree_max_distances(&self) -> Vec<f64> {
        let n = self.n_observations;
        let mut out: Vec<f64> = Vec::with_capacity(self.merges.len());
        for m in &self.merges {
            let child = |id: usize| if id < n { f64::NEG_INFINITY } else { out[id - n] };
            let highest = m.distance.max(child(m.left)).max(child(m.right));
            out.push(highest);
        }
        out
    }

    /// Cut the tree into flat clusters.
    ///
    /// Every maximal subtree whose merges all lie at or below `cutoff`
    /// becomes one cluster. Labels are numbered `0..k` in order of first
    /// appearance over the observations.
    pub fn cut(&self, cutoff: f64) -> Array1<usize> {
        let n = self.n_observations;
        let highest = self.subtree_max_distances();

        let mut parent: Vec<usize> = (0..n).collect();
        // A leaf standing in for each cluster id
        let mut representative: Vec<usize> = (0..n).collect();
        representative.reserve(self.merges.len());

        for (i, m) in self.merges.iter().enumerate() {
            let a = representative[m.left];
            let b = representative[m.right];
            if highest[i] <= cutoff {
                let ra = find(&mut parent, a);
                let rb = find(&mut parent, b);
                if ra != rb {
                    parent[rb] = ra;
                }
            }
            representative.push(a);
        }

        let mut label_of_root = vec![usize::MAX; n];
        let mut next = 0;
        let labels: Vec<usize> = (0..n)
            .map(|leaf| {
                let root = find(&mut parent, leaf);
                if label_of_root[root] == usize::MAX {
                    label_of_root[root] = next;
                    next += 1;
                }
                label_of_root[root]
            })
            .collect();

        Array1::from_vec(labels)
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}
