//! Facade crate for the `geofeat-*` workspace.
//!
//! This crate provides:
//! - re-exports of the raster model ([`core`]) and the pixel algorithms ([`regions`]),
//! - the three feature pipelines in [`pipeline`] (road mask, forest regions,
//!   road axis), each a pure function over rasters plus explicit parameters,
//! - JSON configuration and report types in [`io`],
//! - (feature `cli`) the `geofeat` command-line binary.
//!
//! ## Quickstart
//!
//! ```no_run
//! use geofeat::core::{read_bmp, write_bmp};
//! use geofeat::pipeline::{extract_road_axis, RoadAxisParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = read_bmp("island.bmp")?;
//! let result = extract_road_axis(img, &RoadAxisParams::default())?;
//! if let Some(axis) = result.axis {
//!     println!("axis {:.1} px at {:.1} deg", axis.length, axis.angle_degrees);
//! }
//! write_bmp("road_axis.bmp", &result.annotated)?;
//! # Ok(())
//! # }
//! ```

pub use geofeat_core as core;
pub use geofeat_regions as regions;

pub use geofeat_core::{BinaryRaster, PixelCoord, Polarity, Raster, RasterError};
pub use geofeat_regions::{Axis, BoundingBox, RegionError, RegionRecord};

pub mod io;
pub mod pipeline;
