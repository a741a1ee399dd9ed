//! Binary erosion and dilation with a square structuring element.
//!
//! Both operations read the input as an immutable snapshot and build a new
//! raster, so every output pixel sees unmodified neighbours. Offsets falling
//! outside the image are skipped (no padding, no wrap).

use geofeat_core::{BinaryRaster, Polarity};

use crate::RegionError;

fn half_kernel(size: usize) -> Result<isize, RegionError> {
    if size == 0 || size % 2 == 0 {
        return Err(RegionError::InvalidKernel { size });
    }
    Ok((size / 2) as isize)
}

/// True if any in-bounds pixel of the `(2h+1)^2` window around `(row, col)`
/// has polarity `target`.
#[inline]
fn window_has(src: &BinaryRaster, row: usize, col: usize, h: isize, target: Polarity) -> bool {
    let (height, width) = (src.height() as isize, src.width() as isize);
    let (r, c) = (row as isize, col as isize);
    for nr in (r - h).max(0)..=(r + h).min(height - 1) {
        for nc in (c - h).max(0)..=(c + h).min(width - 1) {
            if src.is_foreground(nr as usize, nc as usize) == (target == Polarity::Foreground) {
                return true;
            }
        }
    }
    false
}

/// Foreground wherever any neighbour in the window is foreground.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(src), fields(width = src.width(), height = src.height()))
)]
pub fn dilate(src: &BinaryRaster, kernel_size: usize) -> Result<BinaryRaster, RegionError> {
    let h = half_kernel(kernel_size)?;
    Ok(src.map(|p| window_has(src, p.row, p.col, h, Polarity::Foreground)))
}

/// Background wherever any neighbour in the window is background.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(src), fields(width = src.width(), height = src.height()))
)]
pub fn erode(src: &BinaryRaster, kernel_size: usize) -> Result<BinaryRaster, RegionError> {
    let h = half_kernel(kernel_size)?;
    Ok(src.map(|p| !window_has(src, p.row, p.col, h, Polarity::Background)))
}

/// Erosion followed by dilation; removes foreground specks thinner than the kernel.
pub fn open(src: &BinaryRaster, kernel_size: usize) -> Result<BinaryRaster, RegionError> {
    dilate(&erode(src, kernel_size)?, kernel_size)
}

/// Dilation followed by erosion; fills background holes smaller than the kernel.
pub fn close(src: &BinaryRaster, kernel_size: usize) -> Result<BinaryRaster, RegionError> {
    erode(&dilate(src, kernel_size)?, kernel_size)
}
