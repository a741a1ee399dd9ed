//! Region properties, area filtering and overlays.

use serde::{Deserialize, Serialize};

use geofeat_core::{BinaryRaster, Pixel, PixelCoord, Polarity, Raster, BLUE, GREEN, RED};

use crate::labeling::{components, Component};

/// Colours cycled over retained regions in discovery order.
pub const PALETTE: [Pixel; 3] = [RED, GREEN, BLUE];

/// Inclusive pixel bounds of a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl BoundingBox {
    pub const fn new(min_row: usize, min_col: usize, max_row: usize, max_col: usize) -> Self {
        Self {
            min_row,
            min_col,
            max_row,
            max_col,
        }
    }

    /// Degenerate box covering a single pixel.
    pub const fn at(p: PixelCoord) -> Self {
        Self::new(p.row, p.col, p.row, p.col)
    }

    pub fn include(&mut self, p: PixelCoord) {
        self.min_row = self.min_row.min(p.row);
        self.min_col = self.min_col.min(p.col);
        self.max_row = self.max_row.max(p.row);
        self.max_col = self.max_col.max(p.col);
    }

    pub fn contains(&self, p: PixelCoord) -> bool {
        (self.min_row..=self.max_row).contains(&p.row)
            && (self.min_col..=self.max_col).contains(&p.col)
    }

    /// Integer midpoint of the box.
    pub fn centroid(&self) -> PixelCoord {
        PixelCoord::new(
            (self.min_row + self.max_row) / 2,
            (self.min_col + self.max_col) / 2,
        )
    }

    pub fn width(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    pub fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    /// Area of the rectangle, not of the region inside it.
    pub fn box_area(&self) -> usize {
        self.width() * self.height()
    }
}

/// A region that survived area filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub bbox: BoundingBox,
    /// Pixel count of the region.
    pub area: usize,
}

impl RegionRecord {
    pub fn centroid(&self) -> PixelCoord {
        self.bbox.centroid()
    }
}

/// Outcome of [`prune_small_components`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneSummary {
    pub kept: usize,
    pub removed: usize,
    pub removed_pixels: usize,
}

/// Bounds recomputed from the component's pixel list.
pub fn bounding_box_of(component: &Component) -> BoundingBox {
    let mut pixels = component.pixels.iter();
    let Some(&first) = pixels.next() else {
        return component.bbox;
    };
    pixels.fold(BoundingBox::at(first), |mut bbox, &p| {
        bbox.include(p);
        bbox
    })
}

pub fn area_of(component: &Component) -> usize {
    component.pixels.len()
}

/// Repaint every `polarity` component smaller than `min_area` with the
/// opposite polarity. Components of at least `min_area` pixels are kept.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(raster), fields(width = raster.width(), height = raster.height()))
)]
pub fn prune_small_components(
    raster: &mut BinaryRaster,
    polarity: Polarity,
    min_area: usize,
) -> PruneSummary {
    let mut summary = PruneSummary::default();
    let small: Vec<Component> = components(raster.as_raster(), polarity)
        .filter(|c| {
            let keep = area_of(c) >= min_area;
            if keep {
                summary.kept += 1;
            }
            !keep
        })
        .collect();

    let fill = polarity.opposite();
    for c in &small {
        summary.removed += 1;
        summary.removed_pixels += area_of(c);
        for &p in &c.pixels {
            raster.set(p, fill);
        }
    }
    log::debug!(
        "pruned {:?} components below {} px: kept {}, removed {} ({} px)",
        polarity,
        min_area,
        summary.kept,
        summary.removed,
        summary.removed_pixels
    );
    summary
}

/// Records of every `polarity` component with at least `min_area` pixels,
/// in row-major discovery order.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(raster), fields(width = raster.width(), height = raster.height()))
)]
pub fn find_regions(raster: &Raster, polarity: Polarity, min_area: usize) -> Vec<RegionRecord> {
    components(raster, polarity)
        .filter(|c| area_of(c) >= min_area)
        .map(|c| RegionRecord {
            bbox: bounding_box_of(&c),
            area: area_of(&c),
        })
        .collect()
}

pub fn palette_color(index: usize) -> Pixel {
    PALETTE[index % PALETTE.len()]
}

/// Paint the outline of `bbox`, growing outward by one pixel per unit of
/// `thickness`. Parts outside the raster are clipped.
pub fn draw_bounding_box(raster: &mut Raster, bbox: &BoundingBox, color: Pixel, thickness: usize) {
    let (r0, c0) = (bbox.min_row as i64, bbox.min_col as i64);
    let (r1, c1) = (bbox.max_row as i64, bbox.max_col as i64);
    for t in 0..thickness as i64 {
        for c in (c0 - t)..=(c1 + t) {
            raster.put(r0 - t, c, color);
            raster.put(r1 + t, c, color);
        }
        for r in (r0 - t)..=(r1 + t) {
            raster.put(r, c0 - t, color);
            raster.put(r, c1 + t, color);
        }
    }
}

/// Plus-shaped marker with arms of `half_len` pixels around `center`.
pub fn draw_centroid_cross(raster: &mut Raster, center: PixelCoord, half_len: usize, color: Pixel) {
    let (r, c) = (center.row as i64, center.col as i64);
    let h = half_len as i64;
    for d in -h..=h {
        raster.put(r + d, c, color);
        raster.put(r, c + d, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofeat_core::{BLACK, WHITE, YELLOW};

    fn blobs() -> BinaryRaster {
        // 3-pixel blob at the bottom left, 1-pixel speck, 6-pixel block.
        let fg = [
            (0, 0),
            (0, 1),
            (1, 0),
            (0, 4),
            (3, 2),
            (3, 3),
            (3, 4),
            (4, 2),
            (4, 3),
            (4, 4),
        ];
        BinaryRaster::from_fn(6, 5, |p| fg.contains(&(p.row, p.col))).expect("raster")
    }

    #[test]
    fn centroid_is_integer_midpoint() {
        let bbox = BoundingBox::new(1, 2, 4, 7);
        assert_eq!(bbox.centroid(), PixelCoord::new(2, 4));
        assert_eq!(bbox.box_area(), 24);
    }

    #[test]
    fn bounding_box_matches_pixels() {
        let bin = blobs();
        let all: Vec<_> = components(bin.as_raster(), Polarity::Foreground).collect();
        assert_eq!(all.len(), 3);
        for c in &all {
            assert_eq!(bounding_box_of(c), c.bbox);
            assert!(c.pixels.iter().all(|&p| c.bbox.contains(p)));
        }
        assert!(!all[2].bbox.contains(PixelCoord::new(0, 0)));
        assert_eq!(bounding_box_of(&all[2]), BoundingBox::new(3, 2, 4, 4));
        assert_eq!(area_of(&all[2]), 6);
    }

    #[test]
    fn prune_keeps_regions_at_threshold() {
        let mut bin = blobs();
        let summary = prune_small_components(&mut bin, Polarity::Foreground, 3);
        assert_eq!(
            summary,
            PruneSummary {
                kept: 2,
                removed: 1,
                removed_pixels: 1
            }
        );
        assert!(!bin.is_foreground(0, 4));
        assert_eq!(bin.count(Polarity::Foreground), 9);
    }

    #[test]
    fn prune_is_idempotent() {
        let mut bin = blobs();
        prune_small_components(&mut bin, Polarity::Foreground, 4);
        let once = bin.clone();
        let again = prune_small_components(&mut bin, Polarity::Foreground, 4);
        assert_eq!(again.removed, 0);
        assert_eq!(bin, once);
    }

    #[test]
    fn background_prune_fills_holes() {
        let mut bin = BinaryRaster::new(5, 5, Polarity::Foreground).expect("raster");
        bin.set(PixelCoord::new(2, 2), Polarity::Background);
        let summary = prune_small_components(&mut bin, Polarity::Background, 2);
        assert_eq!(summary.removed, 1);
        assert_eq!(bin.count(Polarity::Background), 0);
    }

    #[test]
    fn find_regions_filters_by_area() {
        let bin = blobs();
        let regions = find_regions(bin.as_raster(), Polarity::Foreground, 3);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].area, 3);
        assert_eq!(regions[1].bbox, BoundingBox::new(3, 2, 4, 4));
        assert_eq!(regions[1].centroid(), PixelCoord::new(3, 3));
    }

    #[test]
    fn palette_cycles() {
        assert_eq!(palette_color(0), RED);
        assert_eq!(palette_color(1), GREEN);
        assert_eq!(palette_color(2), BLUE);
        assert_eq!(palette_color(3), RED);
    }

    #[test]
    fn box_outline_is_clipped_and_thick() {
        let mut img = Raster::new_fill(8, 8, BLACK).expect("raster");
        draw_bounding_box(&mut img, &BoundingBox::new(0, 2, 4, 5), RED, 2);
        // inner outline
        assert_eq!(img.get(0, 3), Some(RED));
        assert_eq!(img.get(4, 2), Some(RED));
        assert_eq!(img.get(2, 5), Some(RED));
        // second ring grows outward
        assert_eq!(img.get(5, 1), Some(RED));
        assert_eq!(img.get(2, 6), Some(RED));
        // interior untouched
        assert_eq!(img.get(2, 3), Some(BLACK));
        assert_eq!(img.get(7, 7), Some(BLACK));
    }

    #[test]
    fn cross_marks_both_arms() {
        let mut img = Raster::new_fill(5, 5, WHITE).expect("raster");
        draw_centroid_cross(&mut img, PixelCoord::new(0, 0), 2, YELLOW);
        let painted: Vec<_> = img
            .pixels()
            .filter(|&(_, px)| px == YELLOW)
            .map(|(p, _)| (p.row, p.col))
            .collect();
        assert_eq!(painted, vec![(0, 0), (0, 1), (0, 2), (1, 0), (2, 0)]);
    }
}
