//! Embedding scatter plots colored by up to four auxiliary columns.
//!
//! The number of color columns decides the layout:
//!
//! | columns | layout        | figure (in) | marker scale | colorbar ticks |
//! |---------|---------------|-------------|--------------|----------------|
//! | none    | single        | 10 x 7      | 1x           | no colorbar    |
//! | 1       | single        | 6 x 5       | 2x           | yes            |
//! | 2       | 1 x 2         | 12 x 5      | 4x           | no             |
//! | 3 or 4  | 2 x 2         | 12 x 10     | 4x           | no             |
//!
//! Columns with at most `binary_max_unique` distinct values are drawn with
//! a diverging map over `[min - pad, max + pad]`. Anything else is
//! continuous: a broad-spectrum map clipped to percentiles.

use super::colormap::{Colormap, Normalize, DEFAULT_MARKER};
use super::figure::{Colorbar, Coloring, Figure, Panel, PanelLayout};
use super::projector::{validate_embedding, Projector};
use super::umap::Umap;
use crate::error::{KolosalError, Result};
use crate::utils::{ensure_finite, min_max, percentile, unique_count, Timer};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Most color columns a figure can show
pub const MAX_COLOR_COLUMNS: usize = 4;

/// Marker area by point count: the first tier whose threshold the count
/// exceeds wins, otherwise `base`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerTiers {
    /// (point count threshold, marker area in pt²), checked in order
    pub tiers: Vec<(usize, f64)>,
    pub base: f64,
}

impl Default for MarkerTiers {
    fn default() -> Self {
        Self {
            tiers: vec![(3000, 0.5), (1000, 1.0), (500, 4.0)],
            base: 8.0,
        }
    }
}

impl MarkerTiers {
    pub fn area_for(&self, n_points: usize) -> f64 {
        self.tiers
            .iter()
            .find(|(threshold, _)| n_points > *threshold)
            .map(|(_, area)| *area)
            .unwrap_or(self.base)
    }
}

/// Scatter plot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterConfig {
    /// Output resolution
    pub dpi: u32,
    /// Columns with at most this many distinct values are binary
    pub binary_max_unique: usize,
    /// Lower and upper percentile for continuous color limits
    pub clip_percentiles: (f64, f64),
    /// Margin added around binary color limits
    pub binary_padding: f64,
    pub markers: MarkerTiers,
    pub continuous_colormap: Colormap,
    pub binary_colormap: Colormap,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            binary_max_unique: 2,
            clip_percentiles: (1.0, 99.0),
            binary_padding: 0.1,
            markers: MarkerTiers::default(),
            continuous_colormap: Colormap::Turbo,
            binary_colormap: Colormap::Coolwarm,
        }
    }
}

impl ScatterConfig {
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_binary_max_unique(mut self, n: usize) -> Self {
        self.binary_max_unique = n;
        self
    }

    pub fn with_clip_percentiles(mut self, low: f64, high: f64) -> Self {
        self.clip_percentiles = (low, high);
        self
    }
}

/// How a color column is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Binary,
    Continuous,
}

/// Auxiliary values to color points by: one column per panel.
#[derive(Debug, Clone)]
pub struct ColorData {
    values: Array2<f64>,
    labels: Option<Vec<String>>,
}

impl ColorData {
    /// N x d table
    pub fn new(values: Array2<f64>) -> Self {
        Self {
            values,
            labels: None,
        }
    }

    pub fn from_column(values: Array1<f64>) -> Self {
        Self::new(values.insert_axis(Axis(1)))
    }

    /// Integer cluster labels as a single color column
    pub fn from_labels(labels: &Array1<usize>) -> Self {
        Self::from_column(labels.mapv(|l| l as f64))
    }

    /// Per-column subplot titles
    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }
}

/// Builds and saves embedding scatter figures
#[derive(Debug, Clone)]
pub struct ScatterPlotter<P = Umap> {
    config: ScatterConfig,
    projector: P,
}

impl ScatterPlotter<Umap> {
    /// Plotter using the default UMAP projector
    pub fn new(config: ScatterConfig) -> Self {
        Self {
            config,
            projector: Umap::default(),
        }
    }
}

impl Default for ScatterPlotter<Umap> {
    fn default() -> Self {
        Self::new(ScatterConfig::default())
    }
}

impl<P: Projector> ScatterPlotter<P> {
    pub fn with_projector(config: ScatterConfig, projector: P) -> Self {
        Self { config, projector }
    }

    pub fn config(&self) -> &ScatterConfig {
        &self.config
    }

    pub fn classify_column(&self, column: ArrayView1<f64>) -> ColumnKind {
        if unique_count(column.iter().copied()) > self.config.binary_max_unique {
            ColumnKind::Continuous
        } else {
            ColumnKind::Binary
        }
    }

    /// Colormap and limits for one column
    pub fn column_scale(&self, column: ArrayView1<f64>) -> Result<(ColumnKind, Colormap, Normalize)> {
        let kind = self.classify_column(column);
        let values: Vec<f64> = column.to_vec();
        let scale = match kind {
            ColumnKind::Continuous => {
                let (low, high) = self.config.clip_percentiles;
                (
                    kind,
                    self.config.continuous_colormap,
                    Normalize::new(percentile(&values, low)?, percentile(&values, high)?),
                )
            }
            ColumnKind::Binary => {
                let (min, max) = min_max(values.iter().copied()).ok_or_else(|| {
                    KolosalError::DataError("color column is empty".to_string())
                })?;
                let pad = self.config.binary_padding;
                (kind, self.config.binary_colormap, Normalize::new(min - pad, max + pad))
            }
        };
        Ok(scale)
    }

    /// Describe the figure for `embedding` colored by `color`.
    pub fn build_figure(
        &self,
        embedding: ArrayView2<f64>,
        color: Option<&ColorData>,
        title: &str,
    ) -> Result<Figure> {
        let n = embedding.nrows();
        validate_embedding(embedding, n)?;
        if n == 0 {
            return Err(KolosalError::DataError("nothing to plot".to_string()));
        }
        let color = color.filter(|c| c.n_columns() > 0);
        if let Some(color) = color {
            validate_color(color, n)?;
        }

        let points: Vec<(f64, f64)> = embedding.rows().into_iter().map(|r| (r[0], r[1])).collect();
        let base_area = self.config.markers.area_for(n);

        let Some(color) = color else {
            return Ok(Figure {
                title: title.to_string(),
                title_size: 12.0,
                size_inches: (10.0, 7.0),
                layout: PanelLayout::Single,
                points,
                marker_area: base_area,
                equal_aspect: true,
                panels: vec![Panel {
                    title: None,
                    coloring: Coloring::Uniform(DEFAULT_MARKER),
                    colorbar: None,
                }],
            });
        };

        let d = color.n_columns();
        let (layout, size_inches, multiplier, title_size) = match d {
            1 => (PanelLayout::Single, (6.0, 5.0), 2.0, 12.0),
            2 => (PanelLayout::Row, (12.0, 5.0), 4.0, 16.0),
            _ => (PanelLayout::Grid, (12.0, 10.0), 4.0, 16.0),
        };
        let ticks = d == 1;

        let panels = color
            .values()
            .columns()
            .into_iter()
            .enumerate()
            .map(|(i, column)| {
                let (_, colormap, norm) = self.column_scale(column)?;
                let panel_title = if d > 1 {
                    color.labels().map(|labels| labels[i].clone())
                } else {
                    None
                };
                Ok(Panel {
                    title: panel_title,
                    coloring: Coloring::Mapped {
                        values: column.to_vec(),
                        colormap,
                        norm,
                    },
                    colorbar: Some(Colorbar {
                        colormap,
                        norm,
                        ticks,
                    }),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Figure {
            title: title.to_string(),
            title_size,
            size_inches,
            layout,
            points,
            marker_area: base_area * multiplier,
            equal_aspect: false,
            panels,
        })
    }

    /// Scatter `x` in 2-D and save `<figdir>/<savetitle>.png`.
    ///
    /// A supplied `embedding` is used verbatim; otherwise the projector runs
    /// on `x`. Returns the written path.
    pub fn plot(
        &self,
        x: ArrayView2<f64>,
        title: &str,
        savetitle: &str,
        figdir: &Path,
        color: Option<&ColorData>,
        embedding: Option<ArrayView2<f64>>,
    ) -> Result<PathBuf> {
        ensure_output_dir(figdir)?;
        if let Some(color) = color {
            validate_color(color, x.nrows())?;
        }

        let computed;
        let embedding = match embedding {
            Some(e) => e.reborrow(),
            None => {
                let timer = Timer::start("projection");
                computed = self.projector.project(x)?;
                timer.stop();
                computed.view()
            }
        };
        validate_embedding(embedding, x.nrows())?;

        let figure = self.build_figure(embedding, color, title)?;
        let path = figdir.join(format!("{}.png", savetitle));
        figure.save_png(&path, self.config.dpi)?;
        tracing::debug!(path = %path.display(), panels = figure.panels.len(), "saved scatter plot");
        Ok(path)
    }
}

fn validate_color(color: &ColorData, n_rows: usize) -> Result<()> {
    let d = color.n_columns();
    if d > MAX_COLOR_COLUMNS {
        return Err(KolosalError::UnsupportedColorDimensionality {
            columns: d,
            max: MAX_COLOR_COLUMNS,
        });
    }
    if color.n_rows() != n_rows {
        return Err(KolosalError::ShapeError {
            expected: format!("{} color rows", n_rows),
            actual: format!("{} color rows", color.n_rows()),
        });
    }
    if let Some(labels) = color.labels() {
        if labels.len() != d {
            return Err(KolosalError::invalid_parameter(
                "color labels",
                labels.len(),
                &format!("expected one label per color column ({})", d),
            ));
        }
    }
    ensure_finite(&color.values(), "color data")
}

/// The output directory must already exist; it is never created here.
pub(crate) fn ensure_output_dir(figdir: &Path) -> Result<()> {
    if figdir.is_dir() {
        Ok(())
    } else {
        Err(KolosalError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("output directory {} does not exist", figdir.display()),
        )))
    }
}
