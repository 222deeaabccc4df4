//! Dendrogram layout and SVG rendering.
//!
//! Leaves are spaced ten units apart starting at x = 5, and each merge is
//! drawn as a U-shaped link from its two children up to its distance.

use super::colormap::CATEGORICAL_PALETTE;
use super::scatter::ensure_output_dir;
use crate::clustering::linkage::MergeTree;
use crate::error::{KolosalError, Result};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

const FONT: &str = "sans-serif";

/// Output size and stroke settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DendrogramStyle {
    pub width: u32,
    pub height: u32,
    pub line_width: u32,
    pub title_size: f64,
}

impl Default for DendrogramStyle {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 960,
            line_width: 1,
            title_size: 24.0,
        }
    }
}

/// One merge drawn as four points: left foot, left shoulder, right
/// shoulder, right foot.
#[derive(Debug, Clone, PartialEq)]
pub struct DendrogramLink {
    pub xs: [f64; 4],
    pub ys: [f64; 4],
    /// Index of the below-cutoff subtree this link belongs to, counted left
    /// to right; `None` above the cutoff
    pub subtree: Option<usize>,
}

impl DendrogramLink {
    pub fn color(&self) -> RGBColor {
        match self.subtree {
            Some(k) => CATEGORICAL_PALETTE[1 + k % (CATEGORICAL_PALETTE.len() - 1)],
            None => CATEGORICAL_PALETTE[0],
        }
    }
}

/// Geometry of a dendrogram, independent of any backend
#[derive(Debug, Clone)]
pub struct DendrogramLayout {
    leaf_order: Vec<usize>,
    links: Vec<DendrogramLink>,
    cutoff: f64,
    max_height: f64,
    n_colored_subtrees: usize,
}

impl DendrogramLayout {
    pub fn new(tree: &MergeTree, cutoff: f64) -> Self {
        let n = tree.n_observations();
        let merges = tree.merges();
        let highest = tree.subtree_max_distances();
        let node_count = n + merges.len();

        // Pre-order walk from the root, left child first. Each node carries
        // the subtree index inherited from its nearest colored ancestor.
        let mut leaf_order = Vec::with_capacity(n);
        let mut subtree_of: Vec<Option<usize>> = vec![None; merges.len()];
        let mut n_colored_subtrees = 0;
        let mut stack = vec![(tree.root(), None::<usize>)];
        while let Some((id, inherited)) = stack.pop() {
            if id < n {
                leaf_order.push(id);
                continue;
            }
            let i = id - n;
            let subtree = match inherited {
                Some(k) => Some(k),
                None if highest[i] <= cutoff => {
                    n_colored_subtrees += 1;
                    Some(n_colored_subtrees - 1)
                }
                None => None,
            };
            subtree_of[i] = subtree;
            stack.push((merges[i].right, subtree));
            stack.push((merges[i].left, subtree));
        }

        let mut x = vec![0.0; node_count];
        let mut y = vec![0.0; node_count];
        for (position, &leaf) in leaf_order.iter().enumerate() {
            x[leaf] = 5.0 + 10.0 * position as f64;
        }

        let links = merges
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let id = n + i;
                x[id] = (x[m.left] + x[m.right]) / 2.0;
                y[id] = m.distance;
                DendrogramLink {
                    xs: [x[m.left], x[m.left], x[m.right], x[m.right]],
                    ys: [y[m.left], m.distance, m.distance, y[m.right]],
                    subtree: subtree_of[i],
                }
            })
            .collect();

        Self {
            leaf_order,
            links,
            cutoff,
            max_height: tree.max_distance(),
            n_colored_subtrees,
        }
    }

    /// Observations from left to right
    pub fn leaf_order(&self) -> &[usize] {
        &self.leaf_order
    }

    /// One link per merge, in merge order
    pub fn links(&self) -> &[DendrogramLink] {
        &self.links
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn max_height(&self) -> f64 {
        self.max_height
    }

    pub fn n_colored_subtrees(&self) -> usize {
        self.n_colored_subtrees
    }

    pub fn width(&self) -> f64 {
        10.0 * self.leaf_order.len() as f64
    }
}

/// Draw `layout` to an SVG file with a black line at the cutoff.
pub fn render_dendrogram(
    layout: &DendrogramLayout,
    title: &str,
    path: &Path,
    style: &DendrogramStyle,
) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        ensure_output_dir(dir)?;
    }

    let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(KolosalError::render)?;

    let top = layout.max_height().max(layout.cutoff()).max(f64::EPSILON) * 1.05;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, style.title_size).into_font())
        .margin(16)
        .y_label_area_size(56)
        .x_label_area_size(16)
        .build_cartesian_2d(0f64..layout.width(), 0f64..top)
        .map_err(KolosalError::render)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(8)
        .draw()
        .map_err(KolosalError::render)?;

    let stroke = style.line_width;
    chart
        .draw_series(layout.links().iter().map(|link| {
            let points: Vec<(f64, f64)> = link.xs.iter().copied().zip(link.ys.iter().copied()).collect();
            PathElement::new(points, link.color().stroke_width(stroke))
        }))
        .map_err(KolosalError::render)?;

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, layout.cutoff()), (layout.width(), layout.cutoff())],
            BLACK.stroke_width(stroke),
        )))
        .map_err(KolosalError::render)?;

    root.present().map_err(KolosalError::render)?;
    tracing::debug!(path = %path.display(), "saved dendrogram");
    Ok(())
}
