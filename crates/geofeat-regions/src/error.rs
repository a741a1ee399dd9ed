use geofeat_core::PixelCoord;

/// Errors returned by the region algorithms.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("kernel size must be odd and >= 1 (got {size})")]
    InvalidKernel { size: usize },

    #[error("flood fill start ({}, {}) is outside a {width}x{height} raster", .start.row, .start.col)]
    StartOutOfBounds {
        start: PixelCoord,
        width: usize,
        height: usize,
    },

    #[error("flood fill start ({}, {}) was already visited", .start.row, .start.col)]
    StartAlreadyVisited { start: PixelCoord },

    #[error("flood fill start ({}, {}) does not match the requested polarity", .start.row, .start.col)]
    StartPolarityMismatch { start: PixelCoord },

    #[error("visited mask is {mask_width}x{mask_height} but the raster is {width}x{height}")]
    MaskSizeMismatch {
        mask_width: usize,
        mask_height: usize,
        width: usize,
        height: usize,
    },
}
