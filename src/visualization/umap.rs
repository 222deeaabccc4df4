//! UMAP - Uniform Manifold Approximation and Projection
//!
//! Default 2-D layout for embedding scatter plots (McInnes et al., 2018):
//! - Parallel brute-force KNN graph via rayon
//! - Fuzzy simplicial set with binary-search sigma
//! - SGD layout optimization with negative sampling
//!
//! Fixed seed in, fixed embedding out: edges are kept in an ordered map and
//! every random draw comes from one seeded generator.

use super::projector::Projector;
use crate::error::{KolosalError, Result};
use crate::utils::{ensure_finite, Timer};
use ndarray::{Array2, ArrayView2};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// UMAP configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UmapConfig {
    /// Number of nearest neighbors (controls local vs global structure)
    pub n_neighbors: usize,
    /// Minimum distance between points in the embedding
    pub min_dist: f64,
    /// Number of optimization epochs
    pub n_epochs: usize,
    /// SGD learning rate
    pub learning_rate: f64,
    /// Number of negative samples per positive edge
    pub negative_sample_rate: usize,
    /// Spread of the embedding
    pub spread: f64,
    /// Random seed for reproducibility
    pub random_state: u64,
}

impl Default for UmapConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            min_dist: 0.1,
            n_epochs: 200,
            learning_rate: 1.0,
            negative_sample_rate: 5,
            spread: 1.0,
            random_state: 42,
        }
    }
}

impl UmapConfig {
    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.n_neighbors = n_neighbors;
        self
    }

    pub fn with_n_epochs(mut self, n_epochs: usize) -> Self {
        self.n_epochs = n_epochs;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

/// Max-heap entry keyed by distance, so the farthest neighbor is evicted first
#[derive(Clone, Copy)]
struct Neighbor {
    index: usize,
    distance: f64,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.index.cmp(&other.index))
    }
}

/// An edge in the fuzzy simplicial set
#[derive(Debug, Clone, Copy)]
struct Edge {
    i: usize,
    j: usize,
    weight: f64,
}

/// Nearest neighbors of every sample, closest first
struct KnnGraph {
    indices: Vec<Vec<usize>>,
    distances: Vec<Vec<f64>>,
}

/// UMAP dimensionality reduction
#[derive(Debug, Clone, Default)]
pub struct Umap {
    config: UmapConfig,
}

impl Umap {
    /// Create a new UMAP instance
    pub fn new(config: UmapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &UmapConfig {
        &self.config
    }

    /// Run UMAP on dense data. Returns an n_samples x 2 embedding.
    pub fn fit_transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let n = x.nrows();
        if n < 3 {
            return Err(KolosalError::DataError(
                "UMAP requires at least 3 samples".to_string(),
            ));
        }
        if self.config.n_neighbors < 2 {
            return Err(KolosalError::invalid_parameter(
                "n_neighbors",
                self.config.n_neighbors,
                "must be at least 2",
            ));
        }
        ensure_finite(&x, "UMAP input")?;

        let timer = Timer::start("umap");
        let k = self.config.n_neighbors.min(n - 1);

        let knn = self.compute_knn(x, k);
        let edges = self.compute_fuzzy_set(&knn, k);
        let embedding = self.optimize_layout(n, &edges);

        timer.stop();
        Ok(embedding)
    }

    /// Phase 1: brute-force k nearest neighbors, parallel over samples.
    fn compute_knn(&self, x: ArrayView2<f64>, k: usize) -> KnnGraph {
        let n = x.nrows();

        let results: Vec<(Vec<usize>, Vec<f64>)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k + 1);

                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let distance = row
                        .iter()
                        .zip(x.row(j).iter())
                        .map(|(a, b)| (a - b).powi(2))
                        .sum::<f64>()
                        .sqrt();
                    let candidate = Neighbor { index: j, distance };

                    if heap.len() < k {
                        heap.push(candidate);
                    } else if heap.peek().is_some_and(|top| candidate < *top) {
                        heap.pop();
                        heap.push(candidate);
                    }
                }

                let neighbors = heap.into_sorted_vec();
                (
                    neighbors.iter().map(|nb| nb.index).collect(),
                    neighbors.iter().map(|nb| nb.distance).collect(),
                )
            })
            .collect();

        let (indices, distances) = results.into_iter().unzip();
        KnnGraph { indices, distances }
    }

    /// Phase 2: fuzzy simplicial set (edge weights).
    ///
    /// Per point, rho is the nearest-neighbor distance and sigma is found by
    /// binary search so the membership strengths sum to log2(k). Directed
    /// weights are symmetrized with the probabilistic t-conorm.
    fn compute_fuzzy_set(&self, knn: &KnnGraph, k: usize) -> Vec<Edge> {
        let n = knn.indices.len();
        let target = (k as f64).log2();

        let params: Vec<(f64, f64)> = knn
            .distances
            .par_iter()
            .map(|dists| {
                let rho = dists.first().copied().unwrap_or(0.0);

                let mut lo = 1e-8_f64;
                let mut hi = 1000.0_f64;
                let mut sigma = 1.0;
                for _ in 0..64 {
                    sigma = (lo + hi) / 2.0;
                    let sum: f64 = dists
                        .iter()
                        .map(|&d| (-(d - rho).max(0.0) / sigma).exp())
                        .sum();
                    if (sum - target).abs() < 1e-5 {
                        break;
                    }
                    if sum > target {
                        hi = sigma;
                    } else {
                        lo = sigma;
                    }
                }
                (rho, sigma)
            })
            .collect();

        let mut directed: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for i in 0..n {
            let (rho, sigma) = params[i];
            for (&j, &d) in knn.indices[i].iter().zip(knn.distances[i].iter()) {
                let w = (-(d - rho).max(0.0) / sigma.max(1e-12)).exp();
                directed.insert((i, j), w);
            }
        }

        let mut symmetric: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for (&(i, j), &w_ij) in &directed {
            let key = if i < j { (i, j) } else { (j, i) };
            let w_ji = directed.get(&(j, i)).copied().unwrap_or(0.0);
            symmetric.insert(key, w_ij + w_ji - w_ij * w_ji);
        }

        symmetric
            .into_iter()
            .filter(|(_, w)| *w > 1e-8)
            .map(|((i, j), weight)| Edge { i, j, weight })
            .collect()
    }

    /// Phase 3: SGD layout optimization with negative sampling.
    ///
    /// Each edge is sampled every `max_weight / weight` epochs, so heavy
    /// edges pull more often than light ones.
    fn optimize_layout(&self, n_samples: usize, edges: &[Edge]) -> Array2<f64> {
        let (a, b) = find_ab_params(self.config.spread, self.config.min_dist);

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
        let mut embedding: Array2<f64> =
            Array2::from_shape_fn((n_samples, 2), |_| rng.gen_range(-10.0..10.0));

        let n_epochs = self.config.n_epochs;
        let neg_rate = self.config.negative_sample_rate;
        let max_weight = edges.iter().map(|e| e.weight).fold(0.0_f64, f64::max);

        let epochs_per_sample: Vec<f64> = edges
            .iter()
            .map(|e| max_weight / e.weight)
            .collect();
        let mut next_sample = epochs_per_sample.clone();

        for epoch in 0..n_epochs {
            let alpha = self.config.learning_rate * (1.0 - epoch as f64 / n_epochs as f64);

            for (e, edge) in edges.iter().enumerate() {
                if next_sample[e] > (epoch + 1) as f64 {
                    continue;
                }
                next_sample[e] += epochs_per_sample[e];

                let (i, j) = (edge.i, edge.j);

                // Attractive force
                let dy = [
                    embedding[[i, 0]] - embedding[[j, 0]],
                    embedding[[i, 1]] - embedding[[j, 1]],
                ];
                let dist_sq = dy[0] * dy[0] + dy[1] * dy[1];
                if dist_sq > 0.0 {
                    let coeff = -2.0 * a * b * dist_sq.powf(b - 1.0) / (1.0 + a * dist_sq.powf(b));
                    for c in 0..2 {
                        let grad = clip(coeff * dy[c]);
                        embedding[[i, c]] += alpha * grad;
                        embedding[[j, c]] -= alpha * grad;
                    }
                }

                // Repulsive forces against random samples
                for _ in 0..neg_rate {
                    let other = rng.gen_range(0..n_samples);
                    if other == i {
                        continue;
                    }
                    let dy = [
                        embedding[[i, 0]] - embedding[[other, 0]],
                        embedding[[i, 1]] - embedding[[other, 1]],
                    ];
                    let dist_sq = dy[0] * dy[0] + dy[1] * dy[1];
                    let coeff = 2.0 * b / ((0.001 + dist_sq) * (1.0 + a * dist_sq.powf(b)));
                    for c in 0..2 {
                        embedding[[i, c]] += alpha * clip(coeff * dy[c]);
                    }
                }
            }
        }

        embedding
    }
}

impl Projector for Umap {
    fn project(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.fit_transform(x)
    }
}

/// Gradient clipping, as in the reference implementation
fn clip(v: f64) -> f64 {
    v.clamp(-4.0, 4.0)
}

/// Fit `a`, `b` of the curve `1 / (1 + a * d^(2b))` so that it approximates
/// `1` below `min_dist` and `exp(-(d - min_dist) / spread)` above it.
///
/// Least squares over a grid of distances, searched on `b` with `a`
/// solved per candidate.
fn find_ab_params(spread: f64, min_dist: f64) -> (f64, f64) {
    let xs: Vec<f64> = (1..300).map(|i| i as f64 * spread * 3.0 / 300.0).collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| if x < min_dist { 1.0 } else { (-(x - min_dist) / spread).exp() })
        .collect();

    let loss = |a: f64, b: f64| -> f64 {
        xs.iter()
            .zip(ys.iter())
            .map(|(&x, &y)| (1.0 / (1.0 + a * x.powf(2.0 * b)) - y).powi(2))
            .sum()
    };

    let mut best = (1.0, 1.0, f64::INFINITY);
    for bi in 1..=60 {
        let b = bi as f64 * 0.05;
        for ai in 1..=100 {
            let a = ai as f64 * 0.05;
            let l = loss(a, b);
            if l < best.2 {
                best = (a, b, l);
            }
        }
    }
    (best.0, best.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand_distr::StandardNormal;

    /// Two unit-variance blobs in 10-D centered at 0 and 10 on every axis
    fn two_groups(per_group: usize) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        Array2::from_shape_fn((2 * per_group, 10), |(i, _)| {
            let base = if i < per_group { 0.0 } else { 10.0 };
            let noise: f64 = rng.sample(StandardNormal);
            base + noise
        })
    }

    #[test]
    fn test_umap_basic() {
        let x = two_groups(4);
        let umap = Umap::new(UmapConfig::default().with_n_neighbors(3).with_n_epochs(100));
        let result = umap.fit_transform(x.view()).unwrap();

        assert_eq!(result.dim(), (8, 2));
        assert!(result.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_umap_separation() {
        let x = two_groups(100);
        let umap = Umap::default();
        let result = umap.fit_transform(x.view()).unwrap();

        let mean = |rows: std::ops::Range<usize>| {
            let len = rows.len() as f64;
            let (sx, sy) = rows.fold((0.0, 0.0), |acc, r| (acc.0 + result[[r, 0]], acc.1 + result[[r, 1]]));
            (sx / len, sy / len)
        };
        let spread = |rows: std::ops::Range<usize>, center: (f64, f64)| {
            let len = rows.len() as f64;
            rows.map(|r| ((result[[r, 0]] - center.0).powi(2) + (result[[r, 1]] - center.1).powi(2)).sqrt())
                .sum::<f64>()
                / len
        };

        let a = mean(0..100);
        let b = mean(100..200);
        let inter = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
        let intra = spread(0..100, a).max(spread(100..200, b));
        assert!(inter > intra, "groups should separate: inter {} vs intra {}", inter, intra);
    }

    #[test]
    fn test_umap_is_deterministic() {
        let x = two_groups(10);
        let umap = Umap::new(UmapConfig::default().with_n_neighbors(4).with_n_epochs(50));
        let first = umap.fit_transform(x.view()).unwrap();
        let second = umap.fit_transform(x.view()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_umap_config_defaults() {
        let config = UmapConfig::default();
        assert_eq!(config.n_neighbors, 15);
        assert!((config.min_dist - 0.1).abs() < 1e-10);
        assert_eq!(config.n_epochs, 200);
    }

    #[test]
    fn test_umap_too_few_samples() {
        let x = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(Umap::default().fit_transform(x.view()).is_err());
    }

    #[test]
    fn test_ab_params_reasonable() {
        let (a, b) = find_ab_params(1.0, 0.1);
        // Reference values for these settings are about a = 1.58, b = 0.90
        assert!(a > 1.0 && a < 2.5, "a = {}", a);
        assert!(b > 0.6 && b < 1.2, "b = {}", b);
    }
}
