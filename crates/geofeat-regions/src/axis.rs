//! Longest border-to-border axis of the foreground and its rasterization.
//!
//! Candidates are restricted to a band along the image edges; the search over
//! them is exhaustive and therefore quadratic in the candidate count.

use serde::{Deserialize, Serialize};

use geofeat_core::{Pixel, PixelCoord, Polarity, Raster};

/// The farthest-apart pair of border candidates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub p1: PixelCoord,
    pub p2: PixelCoord,
    /// Euclidean distance in pixels.
    pub length: f64,
    /// `atan2(p2.row - p1.row, p2.col - p1.col)` in degrees.
    pub angle_degrees: f64,
}

/// Foreground pixels within `margin` pixels of any image edge, row-major.
pub fn border_points(raster: &Raster, margin: usize) -> Vec<PixelCoord> {
    let (width, height) = (raster.width(), raster.height());
    raster
        .pixels()
        .filter(|&(p, px)| {
            let near_edge = p.row < margin
                || p.row + margin >= height
                || p.col < margin
                || p.col + margin >= width;
            near_edge && Polarity::Foreground.matches(px)
        })
        .map(|(p, _)| p)
        .collect()
}

#[inline]
fn distance(a: PixelCoord, b: PixelCoord) -> f64 {
    let dr = a.row as f64 - b.row as f64;
    let dc = a.col as f64 - b.col as f64;
    dr.hypot(dc)
}

/// Exhaustive search over pairs of [`border_points`].
///
/// Ties keep the first pair in enumeration order. Returns `None` when fewer
/// than two candidates exist.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(raster), fields(width = raster.width(), height = raster.height()))
)]
pub fn longest_axis(raster: &Raster, margin: usize) -> Option<Axis> {
    let candidates = border_points(raster, margin);
    log::debug!("axis search over {} border candidates", candidates.len());

    let mut best: Option<(PixelCoord, PixelCoord, f64)> = None;
    for (i, &a) in candidates.iter().enumerate() {
        for &b in &candidates[i + 1..] {
            let d = distance(a, b);
            if best.is_none_or(|(_, _, max)| d > max) {
                best = Some((a, b, d));
            }
        }
    }

    let (p1, p2, length) = best?;
    let d_row = p2.row as f64 - p1.row as f64;
    let d_col = p2.col as f64 - p1.col as f64;
    Some(Axis {
        p1,
        p2,
        length,
        angle_degrees: d_row.atan2(d_col).to_degrees(),
    })
}

/// Integer Bresenham path from `from` to `to`, both endpoints included.
///
/// Consecutive points differ by at most one in each coordinate.
pub fn line_points(from: PixelCoord, to: PixelCoord) -> Vec<PixelCoord> {
    let (mut x, mut y) = (from.col as i64, from.row as i64);
    let (x2, y2) = (to.col as i64, to.row as i64);
    let dx = (x2 - x).abs();
    let dy = (y2 - y).abs();
    let step_x = if x < x2 { 1 } else { -1 };
    let step_y = if y < y2 { 1 } else { -1 };
    let mut err = dx - dy;

    let mut out = Vec::with_capacity((dx.max(dy) + 1) as usize);
    loop {
        out.push(PixelCoord::new(y as usize, x as usize));
        if x == x2 && y == y2 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += step_x;
        }
        if e2 < dx {
            err += dx;
            y += step_y;
        }
    }
    out
}

/// Paint the Bresenham path between two pixels; points outside are clipped.
pub fn draw_line(raster: &mut Raster, from: PixelCoord, to: PixelCoord, color: Pixel) {
    for p in line_points(from, to) {
        raster.put(p.row as i64, p.col as i64, color);
    }
}

/// Find the longest axis and draw it onto `raster` in `color`.
pub fn trace_longest_axis(raster: &mut Raster, margin: usize, color: Pixel) -> Option<Axis> {
    let axis = longest_axis(raster, margin)?;
    draw_line(raster, axis.p1, axis.p2, color);
    Some(axis)
}
