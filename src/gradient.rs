//! Rasterizes a sparse gradient knot list into a sampled bitmap.

use std::path::Path;

use anyhow::{Context, Result, bail};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::material::GradientKnot;

/// Default bake resolution, both axes.
pub const DEFAULT_RESOLUTION: u32 = 256;

/// Axis the ramp parameter runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradientAxis {
    Horizontal,
    Vertical,
    /// 1-D ramp broadcast across both axes (horizontal sweep).
    Ramp,
}

impl GradientAxis {
    pub fn as_str(self) -> &'static str {
        match self {
            GradientAxis::Horizontal => "Horizontal",
            GradientAxis::Vertical => "Vertical",
            GradientAxis::Ramp => "Ramp",
        }
    }

    pub fn parse(raw: &str) -> Option<GradientAxis> {
        match raw.trim() {
            "Horizontal" => Some(GradientAxis::Horizontal),
            "Vertical" => Some(GradientAxis::Vertical),
            "Ramp" => Some(GradientAxis::Ramp),
            _ => None,
        }
    }
}

/// Sample color at parameter `t`, in 0-255 space with integer truncation.
///
/// Precondition: `knots` is non-empty and sorted by position. The serializer
/// sorts before calling; unsorted input is a caller bug, not re-sorted here.
fn sample(knots: &[GradientKnot], t: f32) -> [u8; 3] {
    let first = &knots[0];
    let last = &knots[knots.len() - 1];
    if t <= first.position {
        return byte_color(first.color);
    }
    if t >= last.position {
        return byte_color(last.color);
    }
    for pair in knots.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.position <= t && t <= b.position {
            let span = b.position - a.position;
            let f = if span > 0.0 { (t - a.position) / span } else { 0.0 };
            let mut out = [0u8; 3];
            for c in 0..3 {
                let lo = a.color[c] * 255.0;
                let hi = b.color[c] * 255.0;
                out[c] = (lo * (1.0 - f) + hi * f) as u8;
            }
            return out;
        }
    }
    byte_color(last.color)
}

fn byte_color(rgb: [f32; 3]) -> [u8; 3] {
    [
        (rgb[0] * 255.0) as u8,
        (rgb[1] * 255.0) as u8,
        (rgb[2] * 255.0) as u8,
    ]
}

/// Rasterize the knot list to a `width` x `height` image along `axis`.
pub fn rasterize(
    knots: &[GradientKnot],
    width: u32,
    height: u32,
    axis: GradientAxis,
) -> Result<RgbaImage> {
    if knots.is_empty() {
        bail!("gradient has no knots");
    }
    if width == 0 || height == 0 {
        bail!("gradient bitmap resolution must be non-zero, got {width}x{height}");
    }

    let mut img = RgbaImage::new(width, height);
    for x in 0..width {
        for y in 0..height {
            let t = match axis {
                GradientAxis::Horizontal | GradientAxis::Ramp => axis_t(x, width),
                GradientAxis::Vertical => axis_t(y, height),
            };
            let [r, g, b] = sample(knots, t);
            img.put_pixel(x, y, Rgba([r, g, b, 255]));
        }
    }
    Ok(img)
}

fn axis_t(i: u32, extent: u32) -> f32 {
    if extent <= 1 {
        0.0
    } else {
        i as f32 / (extent - 1) as f32
    }
}

/// Rasterize and save as PNG, creating the parent directory if needed.
pub fn bake_to_file(
    knots: &[GradientKnot],
    width: u32,
    height: u32,
    axis: GradientAxis,
    path: &Path,
) -> Result<()> {
    let img = rasterize(knots, width, height, axis)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create bake directory {}", parent.display()))?;
    }
    img.save(path)
        .with_context(|| format!("failed to save gradient bitmap to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_blue() -> Vec<GradientKnot> {
        vec![
            GradientKnot::new(0.0, [1.0, 0.0, 0.0]),
            GradientKnot::new(1.0, [0.0, 0.0, 1.0]),
        ]
    }

    #[test]
    fn boundary_and_midpoint_samples() {
        let knots = red_blue();
        assert_eq!(sample(&knots, 0.0), [255, 0, 0]);
        assert_eq!(sample(&knots, 1.0), [0, 0, 255]);
        // Midpoint truncates per channel: 127.5 -> 127.
        assert_eq!(sample(&knots, 0.5), [127, 0, 127]);
    }

    #[test]
    fn samples_clamp_outside_knot_range() {
        let knots = vec![
            GradientKnot::new(0.25, [1.0, 0.0, 0.0]),
            GradientKnot::new(0.75, [0.0, 0.0, 1.0]),
        ];
        assert_eq!(sample(&knots, 0.0), [255, 0, 0]);
        assert_eq!(sample(&knots, 1.0), [0, 0, 255]);
    }

    #[test]
    fn horizontal_and_vertical_axes_sweep_differently() {
        let knots = red_blue();
        let h = rasterize(&knots, 4, 4, GradientAxis::Horizontal).unwrap();
        let v = rasterize(&knots, 4, 4, GradientAxis::Vertical).unwrap();
        // Horizontal: constant down each column. Vertical: constant along each row.
        assert_eq!(h.get_pixel(0, 0), h.get_pixel(0, 3));
        assert_eq!(h.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(h.get_pixel(3, 0).0, [0, 0, 255, 255]);
        assert_eq!(v.get_pixel(0, 0), v.get_pixel(3, 0));
        assert_eq!(v.get_pixel(0, 3).0, [0, 0, 255, 255]);
    }

    #[test]
    fn single_knot_fills_solid() {
        let knots = vec![GradientKnot::new(0.5, [0.0, 1.0, 0.0])];
        let img = rasterize(&knots, 3, 2, GradientAxis::Ramp).unwrap();
        for p in img.pixels() {
            assert_eq!(p.0, [0, 255, 0, 255]);
        }
    }

    #[test]
    fn empty_knots_is_an_error() {
        assert!(rasterize(&[], 4, 4, GradientAxis::Horizontal).is_err());
    }
}
