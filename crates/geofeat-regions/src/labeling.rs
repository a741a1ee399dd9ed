//! 4-connected region labeling by breadth-first flood fill.

use std::collections::VecDeque;

use geofeat_core::{PixelCoord, Polarity, Raster};

use crate::analysis::BoundingBox;
use crate::RegionError;

/// Up, down, left, right as (row, col) deltas.
const NEIGHBORS_4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// One boolean per pixel, owned by a single labeling pass.
#[derive(Clone, Debug)]
pub struct VisitedMask {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl VisitedMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width * height],
        }
    }

    pub fn for_raster(raster: &Raster) -> Self {
        Self::new(raster.width(), raster.height())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reset every entry so the mask can start a new full-image pass.
    pub fn clear(&mut self) {
        self.bits.fill(false);
    }

    /// Out-of-bounds coordinates report `false`.
    #[inline]
    pub fn is_visited(&self, p: PixelCoord) -> bool {
        self.index(p).is_some_and(|i| self.bits[i])
    }

    #[inline]
    pub fn mark(&mut self, p: PixelCoord) {
        if let Some(i) = self.index(p) {
            self.bits[i] = true;
        }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&v| v).count()
    }

    #[inline]
    fn index(&self, p: PixelCoord) -> Option<usize> {
        (p.row < self.height && p.col < self.width).then(|| p.row * self.width + p.col)
    }
}

/// Pixels of one connected region, in BFS discovery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    pub polarity: Polarity,
    pub pixels: Vec<PixelCoord>,
    pub bbox: BoundingBox,
}

impl Component {
    /// Pixel count.
    pub fn area(&self) -> usize {
        self.pixels.len()
    }
}

/// Collect every pixel 4-connected to `start` through pixels of `polarity`.
///
/// Pixels are marked in `visited` when enqueued, so each appears once. Pixels
/// that match neither polarity (overlay colours) behave as walls.
pub fn flood_fill(
    raster: &Raster,
    visited: &mut VisitedMask,
    start: PixelCoord,
    polarity: Polarity,
) -> Result<Component, RegionError> {
    let (width, height) = (raster.width(), raster.height());
    if visited.width() != width || visited.height() != height {
        return Err(RegionError::MaskSizeMismatch {
            mask_width: visited.width(),
            mask_height: visited.height(),
            width,
            height,
        });
    }
    let Some(px) = raster.at(start) else {
        return Err(RegionError::StartOutOfBounds {
            start,
            width,
            height,
        });
    };
    if visited.is_visited(start) {
        return Err(RegionError::StartAlreadyVisited { start });
    }
    if !polarity.matches(px) {
        return Err(RegionError::StartPolarityMismatch { start });
    }

    let mut pixels = Vec::new();
    let mut bbox = BoundingBox::at(start);
    let mut queue = VecDeque::new();
    visited.mark(start);
    queue.push_back(start);

    while let Some(p) = queue.pop_front() {
        pixels.push(p);
        bbox.include(p);

        for (dr, dc) in NEIGHBORS_4 {
            let (Some(row), Some(col)) = (p.row.checked_add_signed(dr), p.col.checked_add_signed(dc))
            else {
                continue;
            };
            let n = PixelCoord::new(row, col);
            if visited.is_visited(n) {
                continue;
            }
            if raster.at(n).is_some_and(|px| polarity.matches(px)) {
                visited.mark(n);
                queue.push_back(n);
            }
        }
    }

    Ok(Component {
        polarity,
        pixels,
        bbox,
    })
}

/// Row-major scan yielding every component of one polarity exactly once.
///
/// The iterator owns a fresh [`VisitedMask`]; nothing is shared between passes.
pub fn components(raster: &Raster, polarity: Polarity) -> Components<'_> {
    Components {
        raster,
        polarity,
        visited: VisitedMask::for_raster(raster),
        next: 0,
    }
}

/// Iterator returned by [`components`].
#[derive(Debug)]
pub struct Components<'a> {
    raster: &'a Raster,
    polarity: Polarity,
    visited: VisitedMask,
    next: usize,
}

impl Iterator for Components<'_> {
    type Item = Component;

    fn next(&mut self) -> Option<Component> {
        let width = self.raster.width();
        let total = width * self.raster.height();
        while self.next < total {
            let p = PixelCoord::new(self.next / width, self.next % width);
            self.next += 1;
            if self.visited.is_visited(p) {
                continue;
            }
            if !self
                .raster
                .at(p)
                .is_some_and(|px| self.polarity.matches(px))
            {
                continue;
            }
            match flood_fill(self.raster, &mut self.visited, p, self.polarity) {
                Ok(component) => return Some(component),
                Err(err) => {
                    // The scan only starts fills on unvisited, matching pixels.
                    debug_assert!(false, "component scan broke a fill precondition: {err}");
                    log::error!("skipping component at {p:?}: {err}");
                }
            }
        }
        None
    }
}
