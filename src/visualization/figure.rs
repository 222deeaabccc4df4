//! Explicit figure objects.
//!
//! A [`Figure`] is plain data describing what to draw. Rendering creates a
//! plotters backend, draws, presents and drops it inside one call, so no
//! drawing state outlives [`Figure::save_png`].

use super::colormap::{Colormap, Normalize};
use crate::error::{KolosalError, Result};
use crate::utils::min_max;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const FONT: &str = "sans-serif";

/// Subplot arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelLayout {
    /// One plot
    Single,
    /// Two plots side by side
    Row,
    /// 2 x 2 grid
    Grid,
}

impl PanelLayout {
    /// (rows, columns)
    pub fn shape(self) -> (usize, usize) {
        match self {
            PanelLayout::Single => (1, 1),
            PanelLayout::Row => (1, 2),
            PanelLayout::Grid => (2, 2),
        }
    }

    /// Number of subplot cells
    pub fn slots(self) -> usize {
        let (rows, cols) = self.shape();
        rows * cols
    }
}

/// How each marker of a panel is colored
#[derive(Debug, Clone, PartialEq)]
pub enum Coloring {
    Uniform(RGBColor),
    Mapped {
        values: Vec<f64>,
        colormap: Colormap,
        norm: Normalize,
    },
}

impl Coloring {
    pub fn color_at(&self, index: usize) -> RGBColor {
        match self {
            Coloring::Uniform(color) => *color,
            Coloring::Mapped {
                values,
                colormap,
                norm,
            } => colormap.color(norm.apply(values[index])),
        }
    }

    pub fn colormap(&self) -> Option<Colormap> {
        match self {
            Coloring::Uniform(_) => None,
            Coloring::Mapped { colormap, .. } => Some(*colormap),
        }
    }
}

/// Color scale drawn next to a panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colorbar {
    pub colormap: Colormap,
    pub norm: Normalize,
    /// Tick labels; without them the bar is only a legend swatch
    pub ticks: bool,
}

/// One subplot
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: Option<String>,
    pub coloring: Coloring,
    pub colorbar: Option<Colorbar>,
}

/// A complete scatter figure. All panels share the same points and axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    /// Title font size in points
    pub title_size: f64,
    pub size_inches: (f64, f64),
    pub layout: PanelLayout,
    pub points: Vec<(f64, f64)>,
    /// Marker area in square points
    pub marker_area: f64,
    /// Expand axis limits so both axes use the same data scale
    pub equal_aspect: bool,
    pub panels: Vec<Panel>,
}

impl Figure {
    /// Cells of the layout left without a panel
    pub fn blank_slots(&self) -> usize {
        self.layout.slots().saturating_sub(self.panels.len())
    }

    pub fn pixel_size(&self, dpi: u32) -> (u32, u32) {
        let px = |inches: f64| (inches * dpi as f64).round() as u32;
        (px(self.size_inches.0), px(self.size_inches.1))
    }

    /// Marker radius in pixels; markers never vanish entirely.
    pub fn marker_radius(&self, dpi: u32) -> i32 {
        let diameter_px = self.marker_area.sqrt() * dpi as f64 / 72.0;
        ((diameter_px / 2.0).round() as i32).max(1)
    }

    /// Padded (x, y) limits over all points. With `aspect` (cell width /
    /// height in pixels) the shorter extent is widened to match.
    pub fn axis_ranges(&self, aspect: Option<f64>) -> ((f64, f64), (f64, f64)) {
        let pad = |(lo, hi): (f64, f64)| {
            let width = hi - lo;
            let margin = if width > 0.0 { width * 0.05 } else { 0.5 };
            (lo - margin, hi + margin)
        };
        let mut x = pad(min_max(self.points.iter().map(|p| p.0)).unwrap_or((0.0, 1.0)));
        let mut y = pad(min_max(self.points.iter().map(|p| p.1)).unwrap_or((0.0, 1.0)));

        if let Some(aspect) = aspect.filter(|a| *a > 0.0) {
            let (wx, wy) = (x.1 - x.0, y.1 - y.0);
            if wx / wy < aspect {
                let grow = (wy * aspect - wx) / 2.0;
                x = (x.0 - grow, x.1 + grow);
            } else {
                let grow = (wx / aspect - wy) / 2.0;
                y = (y.0 - grow, y.1 + grow);
            }
        }
        (x, y)
    }

    /// Render to a PNG at `path`; `dpi` sets pixel size and font scaling.
    pub fn save_png(&self, path: &Path, dpi: u32) -> Result<()> {
        let (width, height) = self.pixel_size(dpi);
        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(KolosalError::render)?;

        let scale = Scale::new(dpi);
        let body = root
            .titled(&self.title, (FONT, scale.font(self.title_size)).into_font())
            .map_err(KolosalError::render)?;

        let cells = body.split_evenly(self.layout.shape());
        let radius = self.marker_radius(dpi);
        let aspect = self.equal_aspect.then(|| {
            let (w, h) = cells[0].dim_in_pixel();
            w as f64 / h.max(1) as f64
        });
        let ranges = self.axis_ranges(aspect);

        for (cell, panel) in cells.iter().zip(self.panels.iter()) {
            self.draw_panel(cell, panel, ranges, radius, &scale)?;
        }

        root.present().map_err(KolosalError::render)?;
        Ok(())
    }

    fn draw_panel<DB: DrawingBackend>(
        &self,
        cell: &DrawingArea<DB, Shift>,
        panel: &Panel,
        ((x0, x1), (y0, y1)): ((f64, f64), (f64, f64)),
        radius: i32,
        scale: &Scale,
    ) -> Result<()> {
        let (plot_area, bar_area) = match panel.colorbar {
            Some(_) => {
                let (w, _) = cell.dim_in_pixel();
                let (left, right) = cell.split_horizontally((w as f64 * 0.84) as i32);
                (left, Some(right))
            }
            None => (cell.clone(), None),
        };

        let mut builder = ChartBuilder::on(&plot_area);
        builder
            .margin(scale.px(6.0))
            .x_label_area_size(scale.px(24.0))
            .y_label_area_size(scale.px(36.0));
        if let Some(title) = &panel.title {
            builder.caption(title, (FONT, scale.font(12.0)).into_font());
        }
        let mut chart = builder
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(KolosalError::render)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .label_style((FONT, scale.font(9.0)).into_font())
            .draw()
            .map_err(KolosalError::render)?;

        chart
            .draw_series(self.points.iter().enumerate().map(|(i, &(x, y))| {
                Circle::new((x, y), radius, panel.coloring.color_at(i).filled())
            }))
            .map_err(KolosalError::render)?;

        if let (Some(bar), Some(area)) = (panel.colorbar, bar_area) {
            draw_colorbar(&area, &bar, scale)?;
        }
        Ok(())
    }
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    bar: &Colorbar,
    scale: &Scale,
) -> Result<()> {
    const STEPS: usize = 256;

    let (mut lo, mut hi) = (bar.norm.vmin, bar.norm.vmax);
    if hi <= lo {
        lo -= 0.5;
        hi += 0.5;
    }

    let mut builder = ChartBuilder::on(area);
    builder
        .margin_top(scale.px(6.0))
        .margin_bottom(scale.px(24.0))
        .margin_left(scale.px(4.0))
        .right_y_label_area_size(if bar.ticks { scale.px(36.0) } else { 0 });
    let mut chart = builder
        .build_cartesian_2d(0f64..1f64, lo..hi)
        .map_err(KolosalError::render)?;

    chart
        .draw_series((0..STEPS).map(|s| {
            let v0 = lo + (hi - lo) * s as f64 / STEPS as f64;
            let v1 = lo + (hi - lo) * (s + 1) as f64 / STEPS as f64;
            let t = (s as f64 + 0.5) / STEPS as f64;
            Rectangle::new([(0.0, v0), (1.0, v1)], bar.colormap.color(t).filled())
        }))
        .map_err(KolosalError::render)?;

    if bar.ticks {
        chart
            .configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_labels(6)
            .label_style((FONT, scale.font(9.0)).into_font())
            .draw()
            .map_err(KolosalError::render)?;
    }
    Ok(())
}

/// Converts point-based sizes to pixels at a given resolution
struct Scale {
    dpi: f64,
}

impl Scale {
    fn new(dpi: u32) -> Self {
        Self { dpi: dpi as f64 }
    }

    fn font(&self, points: f64) -> f64 {
        points * self.dpi / 72.0
    }

    fn px(&self, points: f64) -> i32 {
        (points * self.dpi / 72.0).round() as i32
    }
}
