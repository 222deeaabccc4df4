//! Clustering module: agglomerative merge trees, cutoff selection and the
//! PCA + hierarchical grouping procedure.

pub mod cutoff;
pub mod hierarchical;
pub mod linkage;

pub use cutoff::{CutoffPolicy, MergeStatistic};
pub use hierarchical::{ClusteringResult, HierarchicalClustering, HierarchicalConfig};
pub use linkage::{DistanceMetric, LinkageMethod, Merge, MergeTree};
