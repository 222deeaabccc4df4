//! Visualization module: 2-D projection, scatter dispatch and dendrograms.

pub mod colormap;
pub mod dendrogram;
pub mod figure;
pub mod projector;
pub mod scatter;
pub mod umap;

pub use colormap::{Colormap, Normalize, CATEGORICAL_PALETTE};
pub use dendrogram::{render_dendrogram, DendrogramLayout, DendrogramLink, DendrogramStyle};
pub use figure::{Colorbar, Coloring, Figure, Panel, PanelLayout};
pub use projector::{validate_embedding, PcaProjector, Projector};
pub use scatter::{
    ColorData, ColumnKind, MarkerTiers, ScatterConfig, ScatterPlotter, MAX_COLOR_COLUMNS,
};
pub use umap::{Umap, UmapConfig};
