//! Intensity thresholding.

use geofeat_core::{BinaryRaster, Pixel, Polarity, Raster};

/// Integer mean of the three channels, rounded down.
#[inline]
pub fn mean_intensity(px: Pixel) -> u8 {
    ((px[0] as u16 + px[1] as u16 + px[2] as u16) / 3) as u8
}

#[inline]
fn classify(px: Pixel, threshold: u8) -> Polarity {
    // Strict: a mean equal to the threshold is background.
    if mean_intensity(px) > threshold {
        Polarity::Foreground
    } else {
        Polarity::Background
    }
}

/// Binarize into a new buffer, leaving `raster` untouched.
///
/// `threshold` spans the whole mean-intensity range `0..=255`: at 255 every
/// pixel is background, at 0 every pixel except pure black is foreground.
/// A threshold that turns pure black into foreground cannot be expressed.
pub fn binarize(raster: &Raster, threshold: u8) -> BinaryRaster {
    binarize_in_place(raster.clone(), threshold)
}

/// Binarize by consuming `raster` and reusing its buffer. Same threshold
/// domain as [`binarize`].
pub fn binarize_in_place(raster: Raster, threshold: u8) -> BinaryRaster {
    BinaryRaster::classify(raster, |px| classify(px, threshold))
}
