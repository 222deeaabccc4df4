//! Colormaps and value normalization for scatter coloring.

use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

/// Ten-color categorical cycle; index 0 is reserved for links above the
/// dendrogram cutoff, the rest color clusters.
pub const CATEGORICAL_PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Marker color when no color data is given
pub const DEFAULT_MARKER: RGBColor = CATEGORICAL_PALETTE[0];

/// Moreland's diverging blue-white-red control points
const COOLWARM: [(f64, [f64; 3]); 5] = [
    (0.00, [0.2298, 0.2987, 0.7537]),
    (0.25, [0.5543, 0.6901, 0.9955]),
    (0.50, [0.8650, 0.8650, 0.8650]),
    (0.75, [0.9573, 0.5987, 0.4774]),
    (1.00, [0.7057, 0.0156, 0.1502]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Colormap {
    /// Broad-spectrum rainbow, for continuous values
    Turbo,
    /// Diverging blue-red, for binary values
    Coolwarm,
}

impl Colormap {
    /// Color at position `t`, clamped to `[0, 1]`.
    pub fn color(self, t: f64) -> RGBColor {
        let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
        let rgb = match self {
            Colormap::Turbo => turbo(t),
            Colormap::Coolwarm => interpolate(&COOLWARM, t),
        };
        RGBColor(to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2]))
    }
}

/// Polynomial approximation of Turbo (Mikhailov, 2019)
fn turbo(t: f64) -> [f64; 3] {
    let r = 0.13572138
        + t * (4.61539260 + t * (-42.66032258 + t * (132.13108234 + t * (-152.94239396 + t * 59.28637943))));
    let g = 0.09140261
        + t * (2.19418839 + t * (4.84296658 + t * (-14.18503333 + t * (4.27729857 + t * 2.82956604))));
    let b = 0.10667330
        + t * (12.64194608 + t * (-60.58204836 + t * (110.36276771 + t * (-89.90310912 + t * 27.34824973))));
    [r, g, b]
}

fn interpolate(points: &[(f64, [f64; 3])], t: f64) -> [f64; 3] {
    for pair in points.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            return [
                c0[0] + (c1[0] - c0[0]) * f,
                c0[1] + (c1[1] - c0[1]) * f,
                c0[2] + (c1[2] - c0[2]) * f,
            ];
        }
    }
    points[points.len() - 1].1
}

fn to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Linear map from `[vmin, vmax]` onto `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalize {
    pub vmin: f64,
    pub vmax: f64,
}

impl Normalize {
    pub fn new(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }

    /// Position of `v`; values outside the range map beyond `[0, 1]` and are
    /// clamped by the colormap. A zero-width range maps everything to 0.5.
    pub fn apply(&self, v: f64) -> f64 {
        let width = self.vmax - self.vmin;
        if width.abs() <= f64::EPSILON * self.vmax.abs().max(1.0) {
            0.5
        } else {
            (v - self.vmin) / width
        }
    }
}
