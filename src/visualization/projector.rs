//! 2-D projectors used to lay out points for scatter plots.

use crate::decomposition::{Pca, PcaConfig};
use crate::error::{KolosalError, Result};
use ndarray::{Array2, ArrayView2};

/// Maps an N x n_features table to an N x 2 embedding, row for row.
pub trait Projector {
    fn project(&self, x: ArrayView2<f64>) -> Result<Array2<f64>>;
}

impl<P: Projector + ?Sized> Projector for &P {
    fn project(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        (**self).project(x)
    }
}

impl<P: Projector + ?Sized> Projector for Box<P> {
    fn project(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        (**self).project(x)
    }
}

/// Linear projection onto the first two principal components.
#[derive(Debug, Clone, Default)]
pub struct PcaProjector {
    config: PcaConfig,
}

impl PcaProjector {
    pub fn new(config: PcaConfig) -> Self {
        Self { config }
    }
}

impl Projector for PcaProjector {
    fn project(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let n_components = 2.min(x.ncols()).min(x.nrows());
        let model = Pca::new(self.config.clone()).fit_components(x, n_components)?;
        let projected = model.transform(x)?;
        if projected.ncols() == 2 {
            return Ok(projected);
        }
        // Single-feature input: lay the points out on a line
        let mut embedding = Array2::zeros((projected.nrows(), 2));
        embedding.column_mut(0).assign(&projected.column(0));
        Ok(embedding)
    }
}

/// Check that an embedding lines up with `n_rows` observations.
pub fn validate_embedding(embedding: ArrayView2<f64>, n_rows: usize) -> Result<()> {
    if embedding.ncols() != 2 || embedding.nrows() != n_rows {
        return Err(KolosalError::ShapeError {
            expected: format!("({}, 2)", n_rows),
            actual: format!("({}, {})", embedding.nrows(), embedding.ncols()),
        });
    }
    crate::utils::ensure_finite(&embedding, "embedding")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_pca_projector_shape() {
        let x = array![
            [1.0, 0.0, 0.5],
            [0.0, 1.0, 0.3],
            [1.0, 1.0, 0.8],
            [0.5, 0.5, 0.4],
        ];
        let embedding = PcaProjector::default().project(x.view()).unwrap();
        assert_eq!(embedding.dim(), (4, 2));
    }

    #[test]
    fn test_pca_projector_single_feature() {
        let x = array![[1.0], [2.0], [4.0]];
        let embedding = PcaProjector::default().project(x.view()).unwrap();
        assert_eq!(embedding.dim(), (3, 2));
        assert!(embedding.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_validate_embedding() {
        let e = array![[0.0, 1.0], [2.0, 3.0]];
        assert!(validate_embedding(e.view(), 2).is_ok());
        assert!(validate_embedding(e.view(), 3).is_err());
        let bad = array![[0.0, 1.0, 2.0]];
        assert!(validate_embedding(bad.view(), 1).is_err());
    }
}
