//! PCA - Principal Component Analysis
//!
//! Linear dimensionality reduction used ahead of hierarchical clustering.
//! Eigenpairs of the covariance matrix are extracted one at a time by power
//! iteration with deflation, in order of decreasing variance, until the
//! requested number of components or the variance threshold is reached.

use crate::error::{KolosalError, Result};
use crate::utils::ensure_finite;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// PCA configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Keep the smallest number of components whose cumulative explained
    /// variance ratio exceeds this value
    pub variance_threshold: f64,
    /// Scale every feature to unit variance before decomposing
    pub standardize: bool,
    /// Power iteration cap per component
    pub max_iter: usize,
    /// Convergence tolerance on the eigenvector update
    pub tolerance: f64,
    /// Random seed for power iteration initialization
    pub random_state: u64,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            variance_threshold: 0.95,
            standardize: false,
            max_iter: 500,
            tolerance: 1e-10,
            random_state: 42,
        }
    }
}

impl PcaConfig {
    pub fn with_variance_threshold(mut self, threshold: f64) -> Self {
        self.variance_threshold = threshold;
        self
    }

    pub fn with_standardize(mut self, standardize: bool) -> Self {
        self.standardize = standardize;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

/// How many components to extract
#[derive(Debug, Clone, Copy)]
enum Stop {
    /// Stop once the cumulative ratio exceeds the threshold
    Variance(f64),
    /// Stop after exactly this many components
    Count(usize),
}

/// A fitted decomposition: components, centering and explained variance
#[derive(Debug, Clone)]
pub struct PcaModel {
    mean: Array1<f64>,
    scale: Array1<f64>,
    /// n_components x n_features, rows are unit eigenvectors
    components: Array2<f64>,
    explained_variance: Array1<f64>,
    explained_variance_ratio: Array1<f64>,
    total_variance: f64,
}

impl PcaModel {
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.components.ncols()
    }

    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    /// Raw variance captured by each component
    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    /// Fraction of the total variance captured by each component
    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.explained_variance_ratio
    }

    /// Running sum of [`Self::explained_variance_ratio`]
    pub fn cumulative_explained_variance(&self) -> Array1<f64> {
        let mut acc = 0.0;
        self.explained_variance_ratio
            .mapv(|r| {
                acc += r;
                acc
            })
    }

    pub fn total_variance(&self) -> f64 {
        self.total_variance
    }

    /// Project rows of `x` onto the fitted components (n_samples x n_components)
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} features", self.n_features()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let prepared = (&x - &self.mean.view().insert_axis(Axis(0)))
            / &self.scale.view().insert_axis(Axis(0));
        Ok(prepared.dot(&self.components.t()))
    }
}

/// PCA dimensionality reduction
#[derive(Debug, Clone, Default)]
pub struct Pca {
    config: PcaConfig,
}

impl Pca {
    /// Create a new PCA instance
    pub fn new(config: PcaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PcaConfig {
        &self.config
    }

    /// Fit the fewest components whose cumulative explained variance ratio
    /// exceeds `variance_threshold`.
    pub fn fit(&self, x: ArrayView2<f64>) -> Result<PcaModel> {
        let threshold = self.config.variance_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(KolosalError::invalid_parameter(
                "variance_threshold",
                threshold,
                "must be within (0, 1)",
            ));
        }
        self.fit_with(x, Stop::Variance(threshold))
    }

    /// Fit exactly `n_components` components.
    pub fn fit_components(&self, x: ArrayView2<f64>, n_components: usize) -> Result<PcaModel> {
        if n_components == 0 {
            return Err(KolosalError::invalid_parameter(
                "n_components",
                n_components,
                "must be at least 1",
            ));
        }
        self.fit_with(x, Stop::Count(n_components))
    }

    /// Fit by variance threshold and project the same data.
    pub fn fit_transform(&self, x: ArrayView2<f64>) -> Result<(PcaModel, Array2<f64>)> {
        let model = self.fit(x)?;
        let projected = model.transform(x)?;
        Ok((model, projected))
    }

    fn fit_with(&self, x: ArrayView2<f64>, stop: Stop) -> Result<PcaModel> {
        let (n, d) = x.dim();
        if n < 2 {
            return Err(KolosalError::DataError(
                "PCA requires at least 2 samples".to_string(),
            ));
        }
        if d < 1 {
            return Err(KolosalError::DataError(
                "PCA requires at least 1 feature".to_string(),
            ));
        }
        ensure_finite(&x, "PCA input")?;

        let limit = n.min(d);
        if let Stop::Count(k) = stop {
            if k > limit {
                return Err(KolosalError::invalid_parameter(
                    "n_components",
                    k,
                    &format!("must not exceed min(n_samples, n_features) = {}", limit),
                ));
            }
        }

        // Step 1: Center (and optionally scale) the data
        let (centered, mean, scale) = self.center_and_scale(x);

        // Step 2: Covariance matrix (d x d)
        let cov = centered.t().dot(&centered) / (n as f64 - 1.0);
        let total_variance = cov.diag().sum();

        let magnitude = x.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if total_variance <= 1e-20 * magnitude.powi(2).max(1.0) {
            return Err(KolosalError::ComponentSelection {
                threshold: self.config.variance_threshold,
                reached: 0.0,
            });
        }

        // Step 3: Eigenpairs in decreasing order until the stop rule holds
        let (eigenvalues, eigenvectors) = self.power_iteration(&cov, total_variance, stop, limit)?;

        let k = eigenvalues.len();
        let mut components = Array2::zeros((k, d));
        for (mut row, v) in components.rows_mut().into_iter().zip(eigenvectors.iter()) {
            row.assign(v);
        }
        let explained_variance = Array1::from_vec(eigenvalues);
        let explained_variance_ratio = explained_variance.mapv(|ev| ev / total_variance);

        Ok(PcaModel {
            mean,
            scale,
            components,
            explained_variance,
            explained_variance_ratio,
            total_variance,
        })
    }

    /// Center data (subtract mean) and optionally scale to unit variance.
    fn center_and_scale(&self, x: ArrayView2<f64>) -> (Array2<f64>, Array1<f64>, Array1<f64>) {
        let d = x.ncols();
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(d));

        let scale = if self.config.standardize {
            x.std_axis(Axis(0), 1.0)
                .mapv(|s| if s > 1e-12 { s } else { 1.0 })
        } else {
            Array1::ones(d)
        };

        let centered = (&x - &mean.view().insert_axis(Axis(0))) / &scale.view().insert_axis(Axis(0));
        (centered, mean, scale)
    }

    /// Power iteration with deflation.
    fn power_iteration(
        &self,
        cov: &Array2<f64>,
        total_variance: f64,
        stop: Stop,
        limit: usize,
    ) -> Result<(Vec<f64>, Vec<Array1<f64>>)> {
        let d = cov.nrows();
        let max_components = match stop {
            Stop::Variance(_) => limit,
            Stop::Count(k) => k,
        };

        let mut eigenvalues = Vec::with_capacity(max_components);
        let mut eigenvectors: Vec<Array1<f64>> = Vec::with_capacity(max_components);

        // Work on a copy so we can deflate
        let mut work = cov.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
        let mut cumulative = 0.0;

        for _component in 0..max_components {
            let mut v: Array1<f64> = (0..d).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let norm = v.dot(&v).sqrt().max(1e-12);
            v /= norm;

            for _iter in 0..self.config.max_iter {
                let w = work.dot(&v);
                let w_norm = w.dot(&w).sqrt();
                if w_norm <= f64::MIN_POSITIVE {
                    // Remaining spectrum is numerically zero
                    break;
                }
                let new_v = w / w_norm;
                let diff = (&new_v - &v).mapv(|x| x * x).sum().sqrt();
                v = new_v;
                if diff < self.config.tolerance {
                    break;
                }
            }

            // Largest-magnitude entry positive, so repeated fits agree on sign
            let pivot = v
                .iter()
                .enumerate()
                .fold((0, 0.0f64), |best, (i, &x)| if x.abs() > best.1.abs() { (i, x) } else { best });
            if pivot.1 < 0.0 {
                v.mapv_inplace(|x| -x);
            }

            let eigenvalue = v.dot(&work.dot(&v)).max(0.0);

            // Deflate: A = A - eigenvalue * v * v^T
            let column = v.view().insert_axis(Axis(1));
            let row = v.view().insert_axis(Axis(0));
            work.scaled_add(-eigenvalue, &column.dot(&row));

            cumulative += eigenvalue / total_variance;
            eigenvalues.push(eigenvalue);
            eigenvectors.push(v);

            if let Stop::Variance(threshold) = stop {
                if cumulative > threshold {
                    return Ok((eigenvalues, eigenvectors));
                }
            }
        }

        match stop {
            Stop::Count(_) => Ok((eigenvalues, eigenvectors)),
            Stop::Variance(threshold) => Err(KolosalError::ComponentSelection {
                threshold,
                reached: cumulative,
            }),
        }
    }
}
