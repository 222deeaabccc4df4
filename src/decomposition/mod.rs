//! Decomposition module - linear dimensionality reduction.

pub mod pca;
pub use pca::{Pca, PcaConfig, PcaModel};
