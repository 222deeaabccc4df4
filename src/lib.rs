//! Kolosal Explore - exploratory clustering and embedding plots
//!
//! This crate provides:
//! - PCA reduction with variance-threshold component selection
//! - Agglomerative merge trees with an adaptive percentile cutoff
//! - Dendrogram rendering with per-cluster link colors
//! - 2-D embedding scatter plots colored by up to four auxiliary columns
//!
//! # Modules
//!
//! ## Core
//! - [`decomposition`] - PCA with cumulative explained variance selection
//! - [`clustering`] - Linkage, cutoff policy and the hierarchical procedure
//!
//! ## Plotting
//! - [`visualization`] - UMAP projector, scatter dispatch, dendrograms
//!
//! ## Utilities
//! - [`utils`] - Percentiles, finiteness checks, step timers
//!
//! # Example
//!
//! ```no_run
//! use kolosal_explore::prelude::*;
//! use ndarray::Array2;
//! use std::path::Path;
//!
//! # fn main() -> kolosal_explore::Result<()> {
//! let x = Array2::from_shape_fn((200, 6), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
//! let clustering = HierarchicalClustering::new(HierarchicalConfig::default());
//! let labels = clustering.run(x.view(), "demo", "demo", Path::new("figures"), None)?;
//! println!("{} rows labelled", labels.len());
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Core
pub mod clustering;
pub mod decomposition;

// Plotting
pub mod visualization;

// Utilities
pub mod utils;

pub use error::{KolosalError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{KolosalError, Result};

    // Decomposition
    pub use crate::decomposition::{Pca, PcaConfig, PcaModel};

    // Clustering
    pub use crate::clustering::{
        ClusteringResult, CutoffPolicy, DistanceMetric, HierarchicalClustering,
        HierarchicalConfig, LinkageMethod, MergeStatistic, MergeTree,
    };

    // Visualization
    pub use crate::visualization::{
        ColorData, DendrogramLayout, DendrogramStyle, PcaProjector, Projector, ScatterConfig,
        ScatterPlotter, Umap, UmapConfig,
    };
}
