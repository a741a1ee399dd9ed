use std::path::PathBuf;

/// Errors produced while building, decoding or persisting rasters.
#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("bad bitmap signature {found:?} (expected \"BM\")")]
    BadSignature { found: [u8; 2] },

    #[error("unsupported bits per pixel {bits} (only 24 is supported)")]
    UnsupportedBitDepth { bits: u16 },

    #[error("unsupported compression {compression} (only uncompressed rasters are supported)")]
    UnsupportedCompression { compression: u32 },

    #[error("unsupported info header size {header_size} (expected at least 40)")]
    UnsupportedHeader { header_size: u32 },

    #[error("pixel data offset {offset} overlaps the headers")]
    InvalidPixelOffset { offset: u32 },

    #[error("invalid raster dimensions (width={width}, height={height})")]
    InvalidDimensions { width: i64, height: i64 },

    #[error("truncated {section}: expected {expected} bytes, got {actual}")]
    Truncated {
        section: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("pixel ({row}, {col}) is neither foreground nor background")]
    NotBinary { row: usize, col: usize },
}
