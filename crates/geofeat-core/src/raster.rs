use serde::{Deserialize, Serialize};

use crate::RasterError;

/// One pixel in stored channel order.
///
/// Bitmaps store channels as (blue, green, red); the named colours below
/// follow that order.
pub type Pixel = [u8; 3];

pub const WHITE: Pixel = [255, 255, 255];
pub const BLACK: Pixel = [0, 0, 0];
pub const RED: Pixel = [0, 0, 255];
pub const GREEN: Pixel = [0, 255, 0];
pub const BLUE: Pixel = [255, 0, 0];
pub const YELLOW: Pixel = [0, 255, 255];

const CHANNELS: usize = 3;

/// Bytes per stored row: `width * 3` rounded up to a multiple of four.
#[inline]
pub fn row_stride(width: usize) -> usize {
    (width * CHANNELS).div_ceil(4) * 4
}

/// Pixel position in stored order. Row 0 is the bottom visual row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PixelCoord {
    pub row: usize,
    pub col: usize,
}

impl PixelCoord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Physical resolution carried through the codec untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Horizontal pixels per metre.
    pub x_ppm: i32,
    /// Vertical pixels per metre.
    pub y_ppm: i32,
}

impl Default for Resolution {
    /// 2835 px/m, roughly 72 DPI.
    fn default() -> Self {
        Self {
            x_ppm: 2835,
            y_ppm: 2835,
        }
    }
}

/// Which class of binary pixel an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// All three channels 255.
    Foreground,
    /// All three channels 0.
    Background,
}

impl Polarity {
    /// Exact-match test. Pixels that are neither white nor black match no polarity.
    #[inline]
    pub fn matches(self, px: Pixel) -> bool {
        px == self.pixel()
    }

    #[inline]
    pub fn pixel(self) -> Pixel {
        match self {
            Self::Foreground => WHITE,
            Self::Background => BLACK,
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Self::Foreground => Self::Background,
            Self::Background => Self::Foreground,
        }
    }
}

/// Row-major, bottom-up, 24-bit raster with 4-byte aligned rows.
///
/// Invariant: `data.len() == row_stride(width) * height`, both dimensions > 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<u8>,
    resolution: Resolution,
}

impl Raster {
    /// Raster with every pixel set to `fill` and zeroed padding.
    pub fn new_fill(width: usize, height: usize, fill: Pixel) -> Result<Self, RasterError> {
        check_dims(width, height)?;
        let stride = row_stride(width);
        let len = stride
            .checked_mul(height)
            .ok_or_else(|| invalid_dims(width, height))?;
        let mut data = vec![0u8; len];
        for row in data.chunks_exact_mut(stride) {
            for px in row[..width * CHANNELS].chunks_exact_mut(CHANNELS) {
                px.copy_from_slice(&fill);
            }
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
            resolution: Resolution::default(),
        })
    }

    /// Wrap an already padded buffer.
    pub fn from_padded(width: usize, height: usize, data: Vec<u8>) -> Result<Self, RasterError> {
        check_dims(width, height)?;
        let stride = row_stride(width);
        let expected = stride
            .checked_mul(height)
            .ok_or_else(|| invalid_dims(width, height))?;
        if data.len() != expected {
            return Err(RasterError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
            resolution: Resolution::default(),
        })
    }

    /// Build from tightly packed pixels, `pixels[row * width + col]`.
    pub fn from_pixels(width: usize, height: usize, pixels: &[Pixel]) -> Result<Self, RasterError> {
        let mut raster = Self::new_fill(width, height, BLACK)?;
        if pixels.len() != width * height {
            return Err(RasterError::SizeMismatch {
                expected: width * height * CHANNELS,
                actual: pixels.len() * CHANNELS,
            });
        }
        raster.for_each_pixel_mut(|p, px| *px = pixels[p.row * width + p.col]);
        Ok(raster)
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per stored row including padding.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Padded pixel bytes, bottom row first.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn same_size(&self, other: &Raster) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.height && col < self.width).then(|| row * self.stride + col * CHANNELS)
    }

    /// Signed variant used by clipped drawing.
    #[inline]
    pub fn contains(&self, row: i64, col: i64) -> bool {
        row >= 0 && col >= 0 && (row as u64) < self.height as u64 && (col as u64) < self.width as u64
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Pixel> {
        let i = self.offset(row, col)?;
        self.data.get(i..i + CHANNELS)?.try_into().ok()
    }

    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Pixel> {
        let i = self.offset(row, col)?;
        self.data.get_mut(i..i + CHANNELS)?.try_into().ok()
    }

    #[inline]
    pub fn at(&self, p: PixelCoord) -> Option<Pixel> {
        self.get(p.row, p.col)
    }

    /// Write `px` if `(row, col)` is inside the raster; returns whether it was.
    #[inline]
    pub fn put(&mut self, row: i64, col: i64, px: Pixel) -> bool {
        if !self.contains(row, col) {
            return false;
        }
        match self.get_mut(row as usize, col as usize) {
            Some(dst) => {
                *dst = px;
                true
            }
            None => false,
        }
    }

    /// Pixel bytes of one row without the trailing padding.
    pub fn row(&self, row: usize) -> Option<&[u8]> {
        if row >= self.height {
            return None;
        }
        let start = row * self.stride;
        self.data.get(start..start + self.width * CHANNELS)
    }

    /// All pixels in row-major stored order.
    pub fn pixels(&self) -> impl Iterator<Item = (PixelCoord, Pixel)> + '_ {
        let width = self.width;
        self.data
            .chunks_exact(self.stride)
            .enumerate()
            .flat_map(move |(r, row)| {
                row[..width * CHANNELS]
                    .chunks_exact(CHANNELS)
                    .enumerate()
                    .map(move |(c, px)| (PixelCoord::new(r, c), [px[0], px[1], px[2]]))
            })
    }

    pub fn for_each_pixel_mut(&mut self, mut f: impl FnMut(PixelCoord, &mut Pixel)) {
        let width = self.width;
        for (r, row) in self.data.chunks_exact_mut(self.stride).enumerate() {
            for (c, px) in row[..width * CHANNELS].chunks_exact_mut(CHANNELS).enumerate() {
                if let Ok(px) = <&mut Pixel>::try_from(px) {
                    f(PixelCoord::new(r, c), px);
                }
            }
        }
    }
}

fn check_dims(width: usize, height: usize) -> Result<(), RasterError> {
    let row_bytes = width.checked_mul(CHANNELS).and_then(|b| b.checked_add(3));
    if width == 0 || height == 0 || row_bytes.is_none() {
        return Err(invalid_dims(width, height));
    }
    Ok(())
}

fn invalid_dims(width: usize, height: usize) -> RasterError {
    RasterError::InvalidDimensions {
        width: width as i64,
        height: height as i64,
    }
}

/// A raster in which every pixel is exactly [`WHITE`] or [`BLACK`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryRaster(Raster);

impl BinaryRaster {
    pub fn new(width: usize, height: usize, fill: Polarity) -> Result<Self, RasterError> {
        Ok(Self(Raster::new_fill(width, height, fill.pixel())?))
    }

    /// Build pixel by pixel; `f` returns `true` for foreground.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(PixelCoord) -> bool,
    ) -> Result<Self, RasterError> {
        let mut raster = Raster::new_fill(width, height, BLACK)?;
        raster.for_each_pixel_mut(|p, px| {
            if f(p) {
                *px = WHITE;
            }
        });
        Ok(Self(raster))
    }

    /// New raster of the same size and resolution; `f` returns `true` for
    /// foreground. `self` is only read, so `f` may sample it freely.
    pub fn map(&self, mut f: impl FnMut(PixelCoord) -> bool) -> Self {
        let mut out = self.0.clone();
        out.for_each_pixel_mut(|p, px| *px = if f(p) { WHITE } else { BLACK });
        Self(out)
    }

    /// Reuse `raster`'s buffer, replacing each pixel by its classification.
    pub fn classify(mut raster: Raster, mut f: impl FnMut(Pixel) -> Polarity) -> Self {
        raster.for_each_pixel_mut(|_, px| *px = f(*px).pixel());
        Self(raster)
    }

    pub fn width(&self) -> usize {
        self.0.width
    }

    pub fn height(&self) -> usize {
        self.0.height
    }

    pub fn as_raster(&self) -> &Raster {
        &self.0
    }

    pub fn into_raster(self) -> Raster {
        self.0
    }

    #[inline]
    pub fn is_foreground(&self, row: usize, col: usize) -> bool {
        self.0
            .get(row, col)
            .is_some_and(|px| Polarity::Foreground.matches(px))
    }

    /// Set one pixel; out-of-bounds coordinates are ignored.
    #[inline]
    pub fn set(&mut self, p: PixelCoord, polarity: Polarity) {
        if let Some(px) = self.0.get_mut(p.row, p.col) {
            *px = polarity.pixel();
        }
    }

    pub fn count(&self, polarity: Polarity) -> usize {
        self.0
            .pixels()
            .filter(|&(_, px)| polarity.matches(px))
            .count()
    }
}

impl AsRef<Raster> for BinaryRaster {
    fn as_ref(&self) -> &Raster {
        &self.0
    }
}

impl From<BinaryRaster> for Raster {
    fn from(value: BinaryRaster) -> Self {
        value.0
    }
}

impl TryFrom<Raster> for BinaryRaster {
    type Error = RasterError;

    /// Fails on the first pixel (row-major) that is neither white nor black.
    fn try_from(raster: Raster) -> Result<Self, Self::Error> {
        if let Some((p, _)) = raster
            .pixels()
            .find(|&(_, px)| px != WHITE && px != BLACK)
        {
            return Err(RasterError::NotBinary {
                row: p.row,
                col: p.col,
            });
        }
        Ok(Self(raster))
    }
}
