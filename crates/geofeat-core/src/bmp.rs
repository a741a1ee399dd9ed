//! Uncompressed 24-bit bitmap codec.
//!
//! Layout: a 14-byte file header, a 40-byte info header (larger V4/V5 info
//! headers are accepted on read, their tail is skipped), then bottom-up rows
//! padded to a multiple of four bytes. All header fields are little-endian and
//! are encoded field by field.
//!
//! A negative stored height marks top-down row order. Decoding always returns a
//! bottom-up [`Raster`]; encoding always writes a positive height.

use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{row_stride, Raster, RasterError, Resolution};

pub const SIGNATURE: [u8; 2] = *b"BM";
pub const FILE_HEADER_LEN: usize = 14;
pub const INFO_HEADER_LEN: usize = 40;
/// Offset of the pixel array in every file this codec writes.
pub const PIXEL_DATA_OFFSET: usize = FILE_HEADER_LEN + INFO_HEADER_LEN;

const BITS_PER_PIXEL: u16 = 24;
const COMPRESSION_NONE: u32 = 0;

/// The 14-byte primary header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub signature: [u8; 2],
    pub file_size: u32,
    pub reserved: u32,
    pub pixel_offset: u32,
}

impl FileHeader {
    pub fn decode(bytes: &[u8]) -> Result<Self, RasterError> {
        let b: &[u8; FILE_HEADER_LEN] = fixed(bytes, "file header")?;
        Ok(Self {
            signature: [b[0], b[1]],
            file_size: le_u32(b, 2),
            reserved: le_u32(b, 6),
            pixel_offset: le_u32(b, 10),
        })
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.file_size.to_le_bytes());
        out.extend_from_slice(&self.reserved.to_le_bytes());
        out.extend_from_slice(&self.pixel_offset.to_le_bytes());
    }
}

/// The 40-byte info header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InfoHeader {
    pub header_size: u32,
    pub width: i32,
    /// Negative for top-down storage.
    pub height: i32,
    pub planes: u16,
    pub bits_per_pixel: u16,
    pub compression: u32,
    pub image_size: u32,
    pub x_ppm: i32,
    pub y_ppm: i32,
    pub colors_used: u32,
    pub colors_important: u32,
}

impl InfoHeader {
    pub fn decode(bytes: &[u8]) -> Result<Self, RasterError> {
        let b: &[u8; INFO_HEADER_LEN] = fixed(bytes, "info header")?;
        Ok(Self {
            header_size: le_u32(b, 0),
            width: le_i32(b, 4),
            height: le_i32(b, 8),
            planes: le_u16(b, 12),
            bits_per_pixel: le_u16(b, 14),
            compression: le_u32(b, 16),
            image_size: le_u32(b, 20),
            x_ppm: le_i32(b, 24),
            y_ppm: le_i32(b, 28),
            colors_used: le_u32(b, 32),
            colors_important: le_u32(b, 36),
        })
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.header_size.to_le_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.planes.to_le_bytes());
        out.extend_from_slice(&self.bits_per_pixel.to_le_bytes());
        out.extend_from_slice(&self.compression.to_le_bytes());
        out.extend_from_slice(&self.image_size.to_le_bytes());
        out.extend_from_slice(&self.x_ppm.to_le_bytes());
        out.extend_from_slice(&self.y_ppm.to_le_bytes());
        out.extend_from_slice(&self.colors_used.to_le_bytes());
        out.extend_from_slice(&self.colors_important.to_le_bytes());
    }

    pub fn is_top_down(&self) -> bool {
        self.height < 0
    }

    fn validate(&self) -> Result<(), RasterError> {
        if (self.header_size as usize) < INFO_HEADER_LEN {
            return Err(RasterError::UnsupportedHeader {
                header_size: self.header_size,
            });
        }
        if self.bits_per_pixel != BITS_PER_PIXEL {
            return Err(RasterError::UnsupportedBitDepth {
                bits: self.bits_per_pixel,
            });
        }
        if self.compression != COMPRESSION_NONE {
            return Err(RasterError::UnsupportedCompression {
                compression: self.compression,
            });
        }
        if self.width <= 0 || self.height == 0 {
            return Err(RasterError::InvalidDimensions {
                width: self.width.into(),
                height: self.height.into(),
            });
        }
        Ok(())
    }
}

fn fixed<'a, const N: usize>(
    bytes: &'a [u8],
    section: &'static str,
) -> Result<&'a [u8; N], RasterError> {
    bytes
        .get(..N)
        .and_then(|s| s.try_into().ok())
        .ok_or(RasterError::Truncated {
            section,
            expected: N,
            actual: bytes.len(),
        })
}

#[inline]
fn le_u16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

#[inline]
fn le_u32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

#[inline]
fn le_i32(b: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

/// Decode an in-memory bitmap into a bottom-up raster.
pub fn decode_bmp(bytes: &[u8]) -> Result<Raster, RasterError> {
    let file = FileHeader::decode(bytes)?;
    if file.signature != SIGNATURE {
        return Err(RasterError::BadSignature {
            found: file.signature,
        });
    }
    let info = InfoHeader::decode(&bytes[FILE_HEADER_LEN..])?;
    info.validate()?;

    let header_end = FILE_HEADER_LEN + info.header_size as usize;
    if (file.pixel_offset as usize) < header_end.max(PIXEL_DATA_OFFSET) {
        return Err(RasterError::InvalidPixelOffset {
            offset: file.pixel_offset,
        });
    }

    let width = info.width as usize;
    let height = info.height.unsigned_abs() as usize;
    let stride = row_stride(width);
    let needed = stride
        .checked_mul(height)
        .ok_or(RasterError::InvalidDimensions {
            width: info.width.into(),
            height: info.height.into(),
        })?;
    if info.image_size != 0 && (info.image_size as usize) < needed {
        return Err(RasterError::SizeMismatch {
            expected: needed,
            actual: info.image_size as usize,
        });
    }

    let start = file.pixel_offset as usize;
    let pixels = bytes
        .get(start..start + needed)
        .ok_or(RasterError::Truncated {
            section: "pixel data",
            expected: start + needed,
            actual: bytes.len(),
        })?;

    let mut rows: Vec<&[u8]> = pixels.chunks_exact(stride).collect();
    if info.is_top_down() {
        rows.reverse();
    }
    let mut data = Vec::with_capacity(needed);
    for row in rows {
        data.extend_from_slice(&row[..width * 3]);
        data.resize(data.len() + stride - width * 3, 0);
    }

    log::debug!(
        "decoded {}x{} bitmap ({}, stride {})",
        width,
        height,
        if info.is_top_down() {
            "top-down"
        } else {
            "bottom-up"
        },
        stride
    );

    Ok(Raster::from_padded(width, height, data)?.with_resolution(Resolution {
        x_ppm: info.x_ppm,
        y_ppm: info.y_ppm,
    }))
}

/// Encode a raster as a bottom-up, uncompressed 24-bit bitmap.
pub fn encode_bmp(raster: &Raster) -> Vec<u8> {
    let width = raster.width();
    let height = raster.height();
    let stride = raster.stride();
    let image_size = stride * height;

    let file = FileHeader {
        signature: SIGNATURE,
        file_size: (PIXEL_DATA_OFFSET + image_size) as u32,
        reserved: 0,
        pixel_offset: PIXEL_DATA_OFFSET as u32,
    };
    let res = raster.resolution();
    let info = InfoHeader {
        header_size: INFO_HEADER_LEN as u32,
        width: width as i32,
        height: height as i32,
        planes: 1,
        bits_per_pixel: BITS_PER_PIXEL,
        compression: COMPRESSION_NONE,
        image_size: image_size as u32,
        x_ppm: res.x_ppm,
        y_ppm: res.y_ppm,
        colors_used: 0,
        colors_important: 0,
    };

    let mut out = Vec::with_capacity(PIXEL_DATA_OFFSET + image_size);
    file.encode(&mut out);
    info.encode(&mut out);
    for r in 0..height {
        let row = raster.row(r).unwrap_or_default();
        out.extend_from_slice(row);
        out.resize(out.len() + stride - row.len(), 0);
    }
    out
}

/// Load a bitmap from disk.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(path), fields(path = %path.as_ref().display())))]
pub fn read_bmp(path: impl AsRef<Path>) -> Result<Raster, RasterError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| RasterError::Io {
        op: "read",
        path: path.to_path_buf(),
        source,
    })?;
    decode_bmp(&bytes)
}

/// Save a bitmap to disk.
///
/// The bytes go to a hidden sibling file which is then renamed over `path`,
/// so a failed write leaves any previous file untouched.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(path, raster), fields(path = %path.as_ref().display())))]
pub fn write_bmp(path: impl AsRef<Path>, raster: &Raster) -> Result<(), RasterError> {
    let path = path.as_ref();
    let bytes = encode_bmp(raster);
    let partial = partial_path(path);

    if let Err(source) = fs::write(&partial, &bytes) {
        let _ = fs::remove_file(&partial);
        return Err(RasterError::Io {
            op: "write",
            path: path.to_path_buf(),
            source,
        });
    }
    if let Err(source) = fs::rename(&partial, path) {
        let _ = fs::remove_file(&partial);
        return Err(RasterError::Io {
            op: "rename into",
            path: path.to_path_buf(),
            source,
        });
    }
    log::debug!(
        "wrote {}x{} bitmap ({} bytes) to {}",
        raster.width(),
        raster.height(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "raster.bmp".to_string());
    path.with_file_name(format!(".{name}.partial"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pixel, BLACK};

    fn gradient(width: usize, height: usize) -> Raster {
        let pixels: Vec<Pixel> = (0..width * height)
            .map(|i| [i as u8, (i * 7) as u8, (i * 13) as u8])
            .collect();
        Raster::from_pixels(width, height, &pixels).expect("raster")
    }

    /// Hand-assembled file: top-down when `top_down`, with explicit row bytes.
    fn assemble(width: i32, height: i32, rows: &[Vec<u8>]) -> Vec<u8> {
        let stride = row_stride(width as usize);
        let image_size = stride * rows.len();
        let mut out = Vec::new();
        FileHeader {
            signature: SIGNATURE,
            file_size: (PIXEL_DATA_OFFSET + image_size) as u32,
            reserved: 0,
            pixel_offset: PIXEL_DATA_OFFSET as u32,
        }
        .encode(&mut out);
        InfoHeader {
            header_size: 40,
            width,
            height,
            planes: 1,
            bits_per_pixel: 24,
            compression: 0,
            image_size: image_size as u32,
            x_ppm: 3780,
            y_ppm: 3780,
            colors_used: 0,
            colors_important: 0,
        }
        .encode(&mut out);
        for row in rows {
            out.extend_from_slice(row);
            out.resize(out.len() + stride - row.len(), 0);
        }
        out
    }

    #[test]
    fn headers_are_packed() {
        let mut out = Vec::new();
        FileHeader::decode(&[b'B', b'M', 1, 0, 0, 0, 0, 0, 0, 0, 54, 0, 0, 0])
            .expect("header")
            .encode(&mut out);
        assert_eq!(out.len(), FILE_HEADER_LEN);
        assert_eq!(encode_bmp(&gradient(1, 1)).len(), PIXEL_DATA_OFFSET + 4);
    }

    #[test]
    fn header_fields_are_little_endian() {
        let bytes = encode_bmp(&gradient(5, 3));
        assert_eq!(&bytes[0..2], b"BM");
        assert_eq!(le_u32(&bytes, 2), (54 + 16 * 3) as u32);
        assert_eq!(le_u32(&bytes, 10), 54);
        let info = InfoHeader::decode(&bytes[14..]).expect("info");
        assert_eq!(info.width, 5);
        assert_eq!(info.height, 3);
        assert_eq!(info.bits_per_pixel, 24);
        assert_eq!(info.image_size, 48);
    }

    #[test]
    fn padded_width_round_trips_byte_for_byte() {
        for width in [1, 2, 3, 5, 7] {
            let img = gradient(width, 4);
            let bytes = encode_bmp(&img);
            let decoded = decode_bmp(&bytes).expect("decode");
            assert_eq!(decoded, img);
            assert_eq!(encode_bmp(&decoded), bytes, "width {width}");
        }
    }

    #[test]
    fn foreign_resolution_survives_round_trip() {
        let rows = vec![vec![1, 2, 3, 4, 5, 6, 7, 8, 9]; 2];
        let bytes = assemble(3, 2, &rows);
        let img = decode_bmp(&bytes).expect("decode");
        assert_eq!(img.resolution().x_ppm, 3780);
        assert_eq!(encode_bmp(&img), bytes);
    }

    #[test]
    fn top_down_rows_are_flipped() {
        // First stored row is the top visual row for negative heights.
        let top = vec![9u8, 9, 9, 8, 8, 8];
        let bottom = vec![1u8, 1, 1, 2, 2, 2];
        let bytes = assemble(2, -2, &[top.clone(), bottom.clone()]);
        let img = decode_bmp(&bytes).expect("decode");
        assert_eq!(img.height(), 2);
        assert_eq!(img.get(0, 0), Some([1, 1, 1]));
        assert_eq!(img.get(1, 1), Some([8, 8, 8]));

        // Re-encoded bottom-up: the visual top row is now stored last.
        let out = encode_bmp(&img);
        let info = InfoHeader::decode(&out[14..]).expect("info");
        assert_eq!(info.height, 2);
        assert_eq!(&out[54..60], bottom.as_slice());
        assert_eq!(&out[62..68], top.as_slice());
        assert_eq!(decode_bmp(&out).expect("decode"), img);
    }

    #[test]
    fn padding_bytes_are_zeroed_on_load() {
        let mut bytes = encode_bmp(&Raster::new_fill(1, 1, BLACK).expect("raster"));
        bytes[57] = 0xAB;
        let img = decode_bmp(&bytes).expect("decode");
        assert_eq!(img.data(), &[0, 0, 0, 0]);
    }

    #[test]
    fn rejects_unsupported_formats() {
        let good = encode_bmp(&gradient(2, 2));

        let mut bad = good.clone();
        bad[0] = b'X';
        assert!(matches!(
            decode_bmp(&bad),
            Err(RasterError::BadSignature { .. })
        ));

        let mut bad = good.clone();
        bad[28] = 32;
        assert!(matches!(
            decode_bmp(&bad),
            Err(RasterError::UnsupportedBitDepth { bits: 32 })
        ));

        let mut bad = good.clone();
        bad[30] = 1;
        assert!(matches!(
            decode_bmp(&bad),
            Err(RasterError::UnsupportedCompression { compression: 1 })
        ));

        let mut bad = good;
        bad[34] = 1;
        assert!(matches!(
            decode_bmp(&bad),
            Err(RasterError::SizeMismatch { .. })
        ));
    }

    fn patch(bytes: &[u8], at: usize, field: [u8; 4]) -> Vec<u8> {
        let mut out = bytes.to_vec();
        out[at..at + 4].copy_from_slice(&field);
        out
    }

    #[test]
    fn rejects_bad_dimensions_and_offsets() {
        let good = encode_bmp(&gradient(3, 2));

        for (at, value) in [(18, 0i32), (18, -3), (22, 0)] {
            let bad = patch(&good, at, value.to_le_bytes());
            assert!(
                matches!(decode_bmp(&bad), Err(RasterError::InvalidDimensions { .. })),
                "field at {at} = {value}"
            );
        }

        let bad = patch(&good, 10, 40u32.to_le_bytes());
        assert!(matches!(
            decode_bmp(&bad),
            Err(RasterError::InvalidPixelOffset { offset: 40 })
        ));

        let bad = patch(&good, 14, 12u32.to_le_bytes());
        assert!(matches!(
            decode_bmp(&bad),
            Err(RasterError::UnsupportedHeader { header_size: 12 })
        ));
    }

    #[test]
    fn accepts_v5_info_header() {
        const V5_LEN: usize = 124;
        let img = gradient(3, 2);
        let plain = encode_bmp(&img);

        // Same pixels behind a 124-byte info header whose tail is garbage.
        let offset = FILE_HEADER_LEN + V5_LEN;
        let mut v5 = patch(&plain[..FILE_HEADER_LEN], 10, (offset as u32).to_le_bytes());
        v5.extend_from_slice(&patch(
            &plain[FILE_HEADER_LEN..PIXEL_DATA_OFFSET],
            0,
            (V5_LEN as u32).to_le_bytes(),
        ));
        v5.resize(offset, 0xEE);
        v5.extend_from_slice(&plain[PIXEL_DATA_OFFSET..]);

        let decoded = decode_bmp(&v5).expect("decode v5");
        assert_eq!(decoded, img);
        assert_eq!(encode_bmp(&decoded), plain);

        // The pixel array must not start inside the larger header.
        let inside = patch(&v5, 10, (PIXEL_DATA_OFFSET as u32).to_le_bytes());
        assert!(matches!(
            decode_bmp(&inside),
            Err(RasterError::InvalidPixelOffset { .. })
        ));
    }

    #[test]
    fn rejects_truncated_input() {
        let good = encode_bmp(&gradient(3, 3));
        assert!(matches!(
            decode_bmp(&good[..10]),
            Err(RasterError::Truncated {
                section: "file header",
                ..
            })
        ));
        assert!(matches!(
            decode_bmp(&good[..30]),
            Err(RasterError::Truncated {
                section: "info header",
                ..
            })
        ));
        assert!(matches!(
            decode_bmp(&good[..good.len() - 1]),
            Err(RasterError::Truncated {
                section: "pixel data",
                ..
            })
        ));
    }

    #[test]
    fn file_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("img.bmp");
        let img = gradient(6, 5);
        write_bmp(&path, &img).expect("write");
        assert_eq!(read_bmp(&path).expect("read"), img);
        assert!(!dir.path().join(".img.bmp.partial").exists());

        let err = read_bmp(dir.path().join("missing.bmp")).unwrap_err();
        assert!(matches!(err, RasterError::Io { op: "read", .. }));
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("no_such_dir").join("out.bmp");
        let err = write_bmp(&path, &gradient(2, 2)).unwrap_err();
        assert!(matches!(err, RasterError::Io { op: "write", .. }));
        assert!(!path.exists());
    }
}
