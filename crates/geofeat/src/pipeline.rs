//! The three feature pipelines built on `geofeat-regions`.
//!
//! Each pipeline has a pure form operating on in-memory rasters
//! ([`extract_road_mask`], [`label_forest_regions`], [`extract_road_axis`]) and a
//! file-level wrapper that loads its inputs, runs, and saves the annotated
//! bitmap ([`run_road_mask`], [`run_forest_regions`], [`run_road_axis`]).

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::{read_bmp, write_bmp, BinaryRaster, Pixel, PixelCoord, Polarity, Raster};
use crate::core::{RasterError, GREEN, RED, YELLOW};
use crate::regions::{
    binarize_in_place, dilate, draw_bounding_box, draw_centroid_cross, draw_line, find_regions,
    longest_axis, open, palette_color, prune_small_components, Axis, BoundingBox,
    PruneSummary, RegionError, RegionRecord,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the pipelines.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(
        "{stage}: image is {}x{}, expected {}x{}",
        .actual.0, .actual.1, .expected.0, .expected.1
    )]
    DimensionMismatch {
        stage: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("task `{task}` needs `{field}` to be set")]
    MissingPath {
        task: &'static str,
        field: &'static str,
    },
}

/// Parameters of the road mask pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadMaskParams {
    /// Pixels with mean intensity strictly above this become road.
    pub intensity_threshold: u8,
    /// Road components smaller than this (in pixels) are erased.
    pub min_area: usize,
}

impl Default for RoadMaskParams {
    fn default() -> Self {
        Self {
            intensity_threshold: 98,
            min_area: 900,
        }
    }
}

/// Parameters of the forest labeling pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Minimum pixel count of a non-road region to be labeled.
    pub min_area: usize,
    pub box_thickness: usize,
    /// Arm length of the centroid marker.
    pub cross_half_len: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            min_area: 5000,
            box_thickness: 2,
            cross_half_len: 5,
        }
    }
}

/// Parameters of the road axis pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadAxisParams {
    pub intensity_threshold: u8,
    /// Kernel of the opening (erode, then dilate) cleanup pass. Must be odd.
    pub kernel_size: usize,
    /// Kernel of the follow-up dilation that reconnects broken road. Must be odd.
    pub restore_kernel_size: usize,
    pub min_area: usize,
    /// Width of the edge band that holds axis endpoint candidates.
    pub border_margin: usize,
    pub box_thickness: usize,
}

impl Default for RoadAxisParams {
    fn default() -> Self {
        Self {
            intensity_threshold: 110,
            kernel_size: 3,
            restore_kernel_size: 7,
            min_area: 2000,
            border_margin: 5,
            box_thickness: 2,
        }
    }
}

/// One labeled region as printed and drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionReport {
    /// 1-based, in discovery order.
    pub index: usize,
    pub centroid: PixelCoord,
    /// Pixel count.
    pub area: usize,
    /// Area of the bounding rectangle.
    pub box_area: usize,
    pub bbox: BoundingBox,
    /// Stored channel order (blue, green, red).
    pub color: Pixel,
}

impl RegionReport {
    fn new(position: usize, record: &RegionRecord, color: Pixel) -> Self {
        Self {
            index: position + 1,
            centroid: record.centroid(),
            area: record.area,
            box_area: record.bbox.box_area(),
            bbox: record.bbox,
            color,
        }
    }

    fn log(&self, what: &str) {
        let b = &self.bbox;
        log::info!(
            "{what} {}: centroid=({}, {}) area={} box_area={} bbox=[({}, {}) - ({}, {})]",
            self.index,
            self.centroid.row,
            self.centroid.col,
            self.area,
            self.box_area,
            b.min_row,
            b.min_col,
            b.max_row,
            b.max_col,
        );
    }
}

/// Wall-clock time spent per road axis stage, in microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub binarize_us: u64,
    pub morphology_us: u64,
    pub prune_us: u64,
    pub analysis_us: u64,
    pub axis_us: u64,
    pub draw_us: u64,
    pub total_us: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoadMaskResult {
    pub mask: BinaryRaster,
    pub prune: PruneSummary,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForestResult {
    pub annotated: Raster,
    pub regions: Vec<RegionReport>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoadAxisResult {
    pub annotated: Raster,
    pub regions: Vec<RegionReport>,
    pub axis: Option<Axis>,
    pub timings: StageTimings,
}

/// What a file-level run produced, minus the pixels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub width: usize,
    pub height: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prune: Option<PruneSummary>,
    #[serde(default)]
    pub regions: Vec<RegionReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<Axis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<StageTimings>,
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// Binarize and erase road specks below `min_area`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(raster), fields(width = raster.width(), height = raster.height()))
)]
pub fn extract_road_mask(raster: Raster, params: &RoadMaskParams) -> RoadMaskResult {
    let mut mask = binarize_in_place(raster, params.intensity_threshold);
    let prune = prune_small_components(&mut mask, Polarity::Foreground, params.min_area);
    log::info!(
        "road mask: kept {} components, removed {} ({} px)",
        prune.kept,
        prune.removed,
        prune.removed_pixels
    );
    RoadMaskResult { mask, prune }
}

/// Box every large non-road region of `mask` on top of `original`.
///
/// Regions are the black (background) components of the mask; overlay colours
/// in the mask count as walls. Boxes cycle through red, green and blue, and each
/// centroid gets a yellow cross.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(mask, original), fields(width = mask.width(), height = mask.height()))
)]
pub fn label_forest_regions(
    mask: &Raster,
    mut original: Raster,
    params: &ForestParams,
) -> Result<ForestResult, PipelineError> {
    if !mask.same_size(&original) {
        return Err(PipelineError::DimensionMismatch {
            stage: "forest regions",
            expected: (mask.width(), mask.height()),
            actual: (original.width(), original.height()),
        });
    }

    let records = find_regions(mask, Polarity::Background, params.min_area);
    let mut regions = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let report = RegionReport::new(i, record, palette_color(i));
        draw_bounding_box(&mut original, &report.bbox, report.color, params.box_thickness);
        draw_centroid_cross(&mut original, report.centroid, params.cross_half_len, YELLOW);
        report.log("forest region");
        regions.push(report);
    }
    log::info!("forest regions: {} labeled", regions.len());

    Ok(ForestResult {
        annotated: original,
        regions,
    })
}

/// Clean the road mask, box its remaining components in red and draw the
/// longest border-to-border axis in green.
///
/// The axis is searched on the cleaned binary raster before any overlay is
/// drawn, so boxes never contribute candidates.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(raster), fields(width = raster.width(), height = raster.height()))
)]
pub fn extract_road_axis(
    raster: Raster,
    params: &RoadAxisParams,
) -> Result<RoadAxisResult, PipelineError> {
    let mut timings = StageTimings::default();
    let start = Instant::now();

    let t = Instant::now();
    let binary = binarize_in_place(raster, params.intensity_threshold);
    timings.binarize_us = micros(t.elapsed());

    let t = Instant::now();
    let opened = open(&binary, params.kernel_size)?;
    let mut cleaned = dilate(&opened, params.restore_kernel_size)?;
    timings.morphology_us = micros(t.elapsed());

    let t = Instant::now();
    let prune = prune_small_components(&mut cleaned, Polarity::Foreground, params.min_area);
    timings.prune_us = micros(t.elapsed());

    let t = Instant::now();
    let records = find_regions(cleaned.as_raster(), Polarity::Foreground, params.min_area);
    timings.analysis_us = micros(t.elapsed());

    let t = Instant::now();
    let axis = longest_axis(cleaned.as_raster(), params.border_margin);
    timings.axis_us = micros(t.elapsed());

    let t = Instant::now();
    let mut annotated = cleaned.into_raster();
    let mut regions = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let report = RegionReport::new(i, record, RED);
        draw_bounding_box(&mut annotated, &report.bbox, RED, params.box_thickness);
        report.log("road component");
        regions.push(report);
    }
    if let Some(axis) = &axis {
        draw_line(&mut annotated, axis.p1, axis.p2, GREEN);
    }
    timings.draw_us = micros(t.elapsed());
    timings.total_us = micros(start.elapsed());

    log::info!(
        "road axis: {} components kept, {} pruned",
        prune.kept,
        prune.removed
    );
    match &axis {
        Some(a) => log::info!(
            "longest axis ({}, {}) -> ({}, {}): length {:.2} px, orientation {:.2} deg",
            a.p1.row,
            a.p1.col,
            a.p2.row,
            a.p2.col,
            a.length,
            a.angle_degrees
        ),
        None => log::warn!(
            "fewer than two road pixels within {} px of the border; no axis drawn",
            params.border_margin
        ),
    }
    log::info!(
        "timings (us): binarize {} morphology {} prune {} analysis {} axis {} draw {} total {}",
        timings.binarize_us,
        timings.morphology_us,
        timings.prune_us,
        timings.analysis_us,
        timings.axis_us,
        timings.draw_us,
        timings.total_us
    );

    Ok(RoadAxisResult {
        annotated,
        regions,
        axis,
        timings,
    })
}

/// Load `input`, extract the road mask and save it to `output`.
pub fn run_road_mask(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    params: &RoadMaskParams,
) -> Result<RunSummary, PipelineError> {
    let img = read_bmp(input)?;
    let (width, height) = (img.width(), img.height());
    let result = extract_road_mask(img, params);
    write_bmp(output.as_ref(), result.mask.as_raster())?;
    log::info!("road mask saved to {}", output.as_ref().display());
    Ok(RunSummary {
        width,
        height,
        prune: Some(result.prune),
        ..RunSummary::default()
    })
}

/// Load a road mask and the image it came from, label forest regions on the
/// image and save it to `output`.
pub fn run_forest_regions(
    mask: impl AsRef<Path>,
    original: impl AsRef<Path>,
    output: impl AsRef<Path>,
    params: &ForestParams,
) -> Result<RunSummary, PipelineError> {
    let mask = read_bmp(mask)?;
    let original = read_bmp(original)?;
    let result = label_forest_regions(&mask, original, params)?;
    write_bmp(output.as_ref(), &result.annotated)?;
    log::info!("forest regions saved to {}", output.as_ref().display());
    Ok(RunSummary {
        width: result.annotated.width(),
        height: result.annotated.height(),
        regions: result.regions,
        ..RunSummary::default()
    })
}

/// Load `input`, run the road axis pipeline and save the annotation to `output`.
pub fn run_road_axis(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    params: &RoadAxisParams,
) -> Result<RunSummary, PipelineError> {
    let img = read_bmp(input)?;
    let result = extract_road_axis(img, params)?;
    write_bmp(output.as_ref(), &result.annotated)?;
    log::info!("road axis saved to {}", output.as_ref().display());
    Ok(RunSummary {
        width: result.annotated.width(),
        height: result.annotated.height(),
        prune: None,
        regions: result.regions,
        axis: result.axis,
        timings: Some(result.timings),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BLACK, BLUE, WHITE};
    use crate::regions::binarize;

    fn gray(width: usize, height: usize, f: impl Fn(usize, usize) -> u8) -> Raster {
        let pixels: Vec<Pixel> = (0..height)
            .flat_map(|r| (0..width).map(move |c| (r, c)))
            .map(|(r, c)| {
                let v = f(r, c);
                [v, v, v]
            })
            .collect();
        Raster::from_pixels(width, height, &pixels).expect("raster")
    }

    #[test]
    fn defaults_carry_reference_constants() {
        assert_eq!(
            RoadMaskParams::default(),
            RoadMaskParams {
                intensity_threshold: 98,
                min_area: 900
            }
        );
        assert_eq!(ForestParams::default().min_area, 5000);
        let axis = RoadAxisParams::default();
        assert_eq!((axis.kernel_size, axis.restore_kernel_size), (3, 7));
        assert_eq!((axis.min_area, axis.border_margin), (2000, 5));
    }

    #[test]
    fn partial_params_fill_from_defaults() {
        let p: RoadAxisParams = serde_json::from_str(r#"{"min_area": 10}"#).expect("json");
        assert_eq!(p.min_area, 10);
        assert_eq!(p.intensity_threshold, 110);
    }

    #[test]
    fn road_mask_drops_specks() {
        // A bright 4x4 block and a lone bright pixel on a dark field.
        let img = gray(10, 10, |r, c| {
            if (r < 4 && c < 4) || (r, c) == (8, 8) {
                200
            } else {
                30
            }
        });
        let params = RoadMaskParams {
            intensity_threshold: 98,
            min_area: 4,
        };
        let out = extract_road_mask(img, &params);
        assert_eq!(out.prune.kept, 1);
        assert_eq!(out.prune.removed, 1);
        assert_eq!(out.mask.count(Polarity::Foreground), 16);
        assert!(!out.mask.is_foreground(8, 8));
    }

    #[test]
    fn forest_rejects_mismatched_sizes() {
        let mask = Raster::new_fill(4, 4, BLACK).expect("raster");
        let img = Raster::new_fill(5, 4, WHITE).expect("raster");
        let err = label_forest_regions(&mask, img, &ForestParams::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                expected: (4, 4),
                actual: (5, 4),
                ..
            }
        ));
    }

    #[test]
    fn forest_boxes_cycle_palette() {
        // Road columns 4 and 9 split the black field into three blocks.
        let mask = BinaryRaster::from_fn(15, 6, |p| p.col == 4 || p.col == 9)
            .expect("mask")
            .into_raster();
        let img = Raster::new_fill(15, 6, WHITE).expect("raster");
        let params = ForestParams {
            min_area: 20,
            box_thickness: 1,
            cross_half_len: 1,
        };
        let out = label_forest_regions(&mask, img, &params).expect("forest");
        let colors: Vec<_> = out.regions.iter().map(|r| r.color).collect();
        assert_eq!(colors, vec![RED, GREEN, BLUE]);
        assert_eq!(out.regions[0].index, 1);
        assert_eq!(out.regions[0].bbox, BoundingBox::new(0, 0, 5, 3));
        assert_eq!(out.regions[0].area, 24);
        assert_eq!(out.regions[0].centroid, PixelCoord::new(2, 1));
        assert_eq!(out.annotated.get(2, 1), Some(YELLOW));
        assert_eq!(out.annotated.get(0, 0), Some(RED));
    }

    #[test]
    fn road_axis_on_diagonal_band() {
        // A 5-px wide band along the main diagonal of a 40x40 image.
        let img = gray(40, 40, |r, c| if r.abs_diff(c) <= 2 { 255 } else { 0 });
        let params = RoadAxisParams {
            min_area: 50,
            ..RoadAxisParams::default()
        };
        let out = extract_road_axis(img, &params).expect("axis");
        assert_eq!(out.regions.len(), 1);
        assert!(out.regions.iter().all(|r| r.color == RED));
        let axis = out.axis.expect("axis");
        assert!(axis.length > 50.0);
        assert!((axis.angle_degrees - 45.0).abs() < 10.0);
        assert!(out.timings.total_us >= out.timings.binarize_us);
        assert!(out.annotated.pixels().any(|(_, px)| px == GREEN));
    }

    #[test]
    fn road_axis_cleanup_is_opening_then_restore() {
        // Bright block, a one-pixel-wide spur and an isolated speck.
        let img = gray(20, 16, |r, c| {
            let block = (4..=10).contains(&r) && (3..=9).contains(&c);
            let spur = r == 7 && (10..=16).contains(&c);
            if block || spur || (r, c) == (14, 17) {
                230
            } else {
                10
            }
        });
        let params = RoadAxisParams {
            min_area: 0,
            border_margin: 0,
            box_thickness: 0,
            ..RoadAxisParams::default()
        };
        let expected = dilate(
            &open(&binarize(&img, params.intensity_threshold), params.kernel_size)
                .expect("open"),
            params.restore_kernel_size,
        )
        .expect("dilate");

        let out = extract_road_axis(img, &params).expect("axis");
        assert!(out.axis.is_none());
        assert_eq!(out.annotated, expected.into_raster());
        assert_eq!(out.regions.len(), 1);
    }

    #[test]
    fn road_axis_without_road_has_no_axis() {
        let img = gray(12, 12, |_, _| 0);
        let out = extract_road_axis(img, &RoadAxisParams::default()).expect("axis");
        assert!(out.axis.is_none());
        assert!(out.regions.is_empty());
    }

    #[test]
    fn road_axis_rejects_even_kernel() {
        let img = gray(8, 8, |_, _| 255);
        let params = RoadAxisParams {
            kernel_size: 4,
            ..RoadAxisParams::default()
        };
        assert!(matches!(
            extract_road_axis(img, &params),
            Err(PipelineError::Region(RegionError::InvalidKernel { size: 4 }))
        ));
    }
}
