//! Core raster types and the bitmap codec for geofeat.
//!
//! The crate owns everything the pixel algorithms agree on:
//! - [`Raster`]: a padded, bottom-up, 3-bytes-per-pixel buffer with
//!   bounds-checked accessors,
//! - [`BinaryRaster`]: a raster restricted to all-white / all-black pixels,
//! - the uncompressed 24-bit bitmap codec in [`bmp`].
//!
//! It does *not* implement any feature extraction; see `geofeat-regions`.

pub mod bmp;
mod error;
mod logger;
mod raster;

pub use bmp::{decode_bmp, encode_bmp, read_bmp, write_bmp};
pub use error::RasterError;
pub use raster::{
    row_stride, BinaryRaster, Pixel, PixelCoord, Polarity, Raster, Resolution, BLACK, BLUE, GREEN,
    RED, WHITE, YELLOW,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
