//! Pixel algorithms over geofeat rasters.
//!
//! This crate focuses on:
//! - binarization by mean intensity ([`binarize`]),
//! - 4-connected BFS labeling ([`flood_fill`], [`components`]),
//! - square-kernel binary erosion/dilation ([`erode`], [`dilate`]),
//! - per-region bounding boxes, area filtering and overlays,
//! - longest border-to-border axis and Bresenham rasterization.
//!
//! Every operation is single-threaded and works on an exclusively owned
//! raster; labeling passes allocate their own [`VisitedMask`].

mod analysis;
mod axis;
mod error;
mod labeling;
mod morphology;
mod threshold;

pub use analysis::{
    area_of, bounding_box_of, draw_bounding_box, draw_centroid_cross, find_regions,
    palette_color, prune_small_components, BoundingBox, PruneSummary, RegionRecord, PALETTE,
};
pub use axis::{border_points, draw_line, line_points, longest_axis, trace_longest_axis, Axis};
pub use error::RegionError;
pub use labeling::{components, flood_fill, Component, Components, VisitedMask};
pub use morphology::{close, dilate, erode, open};
pub use threshold::{binarize, binarize_in_place, mean_intensity};
