//! Per-region geometric descriptors for segmented masks.
//!
//! Labels 8-connected foreground components and computes one
//! [`Region`] per component. The estimators are fixed because the
//! classifier thresholds are calibrated against them:
//!
//! - **perimeter** — weighted border-pixel count: each foreground
//!   pixel with a 4-connected background neighbor contributes 1,
//!   `(1 + √2) / 2`, or `√2` depending on the local configuration of
//!   neighboring border pixels. Approximates the length of the
//!   underlying smooth contour rather than the raw pixel-edge count.
//! - **eccentricity** — `sqrt(1 - λ₂/λ₁)` from the eigenvalues
//!   `λ₁ ≥ λ₂` of the region's second-order central-moment tensor,
//!   i.e. the elongation of the best-fit ellipse.
//! - **solidity** — pixel area divided by the pixel count of the
//!   filled convex hull (hull rasterized and unioned with the region,
//!   so solidity never exceeds 1).

use image::Luma;
use imageproc::drawing::draw_polygon_mut;
use imageproc::geometry::convex_hull;
use imageproc::point::Point;
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::types::{AnalysisError, BoundingBox, GrayImage, Region};

/// Extract a geometric descriptor for every foreground component.
///
/// Components are labeled in discovery order and emitted in ascending
/// label order. No size filtering happens here — undersized noise was
/// already removed during segmentation.
///
/// # Errors
///
/// Returns [`AnalysisError::DegenerateRegion`] if a component's
/// geometry admits no finite descriptor (a single pixel, or any shape
/// whose moment tensor or boundary collapses to zero). Such regions
/// cannot occur after the segmenter's size filter; the error exists
/// so a malformed mask fails loudly instead of yielding NaN.
pub fn extract(mask: &GrayImage) -> Result<Vec<Region>, AnalysisError> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0_u8]));

    let mut components: Vec<Vec<(u32, u32)>> = Vec::new();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel.0[0] as usize;
        if label == 0 {
            continue;
        }
        if label > components.len() {
            components.resize_with(label, Vec::new);
        }
        components[label - 1].push((x, y));
    }

    let mut regions = Vec::with_capacity(components.len());
    for (index, pixels) in components.iter().enumerate() {
        if pixels.is_empty() {
            continue;
        }
        #[allow(clippy::cast_possible_truncation)]
        let label = index as u32 + 1;
        regions.push(measure(label, pixels)?);
    }
    Ok(regions)
}

/// Compute the full descriptor for one labeled component.
#[allow(clippy::cast_possible_truncation)]
fn measure(label: u32, pixels: &[(u32, u32)]) -> Result<Region, AnalysisError> {
    let bounding_box = bounding_box(pixels);

    let eccentricity =
        moment_eccentricity(pixels).ok_or(AnalysisError::DegenerateRegion { label })?;

    let grid = PaddedGrid::new(pixels, &bounding_box);
    let perimeter = grid.weighted_perimeter();
    if perimeter <= 0.0 {
        return Err(AnalysisError::DegenerateRegion { label });
    }

    let area = pixels.len() as u32;
    let hull_pixels = filled_hull_area(pixels, &bounding_box);
    let solidity = f64::from(area) / f64::from(hull_pixels);

    Ok(Region {
        area,
        perimeter,
        eccentricity,
        solidity,
        bounding_box,
    })
}

/// Half-open bounding box of a non-empty pixel set.
fn bounding_box(pixels: &[(u32, u32)]) -> BoundingBox {
    let (mut min_row, mut min_col) = (u32::MAX, u32::MAX);
    let (mut max_row, mut max_col) = (0, 0);
    for &(col, row) in pixels {
        min_row = min_row.min(row);
        min_col = min_col.min(col);
        max_row = max_row.max(row);
        max_col = max_col.max(col);
    }
    BoundingBox {
        min_row,
        min_col,
        max_row: max_row + 1,
        max_col: max_col + 1,
    }
}

/// Eccentricity of the best-fit ellipse from second-order central
/// moments. Returns `None` when the moment tensor is totally
/// degenerate (both eigenvalues zero, e.g. a single pixel).
#[allow(clippy::cast_precision_loss)]
fn moment_eccentricity(pixels: &[(u32, u32)]) -> Option<f64> {
    let n = pixels.len() as f64;
    let (sum_c, sum_r) = pixels.iter().fold((0.0, 0.0), |(sc, sr), &(c, r)| {
        (sc + f64::from(c), sr + f64::from(r))
    });
    let (mean_c, mean_r) = (sum_c / n, sum_r / n);

    let (mut mu_cc, mut mu_rr, mut mu_cr) = (0.0, 0.0, 0.0);
    for &(c, r) in pixels {
        let dc = f64::from(c) - mean_c;
        let dr = f64::from(r) - mean_r;
        mu_cc += dc * dc;
        mu_rr += dr * dr;
        mu_cr += dc * dr;
    }
    mu_cc /= n;
    mu_rr /= n;
    mu_cr /= n;

    // Eigenvalues of the symmetric 2x2 moment tensor.
    let trace_half = (mu_cc + mu_rr) / 2.0;
    let discriminant = ((mu_cc - mu_rr) / 2.0).hypot(mu_cr);
    let major = trace_half + discriminant;
    let minor = trace_half - discriminant;

    if major <= 0.0 {
        return None;
    }
    Some((1.0 - minor / major).clamp(0.0, 1.0).sqrt())
}

/// Pixel count of the component's filled convex hull.
///
/// The hull polygon is rasterized onto a bounding-box-sized canvas
/// and unioned with the component itself, so the result is always at
/// least the component's area. Collinear components (hull with fewer
/// than three vertices) are their own hull.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn filled_hull_area(pixels: &[(u32, u32)], bbox: &BoundingBox) -> u32 {
    let local: Vec<Point<i32>> = pixels
        .iter()
        .map(|&(c, r)| Point::new((c - bbox.min_col) as i32, (r - bbox.min_row) as i32))
        .collect();
    let hull = convex_hull(local);
    if hull.len() < 3 {
        return pixels.len() as u32;
    }

    let mut canvas = GrayImage::new(bbox.width(), bbox.height());
    draw_polygon_mut(&mut canvas, &hull, Luma([255]));
    for &(c, r) in pixels {
        canvas.put_pixel(c - bbox.min_col, r - bbox.min_row, Luma([255]));
    }
    canvas.pixels().filter(|p| p.0[0] == 255).count() as u32
}

/// A component's local occupancy grid with a one-pixel background
/// border, so neighbor lookups never leave the grid.
struct PaddedGrid {
    cells: Vec<bool>,
    width: usize,
    height: usize,
}

impl PaddedGrid {
    fn new(pixels: &[(u32, u32)], bbox: &BoundingBox) -> Self {
        let width = bbox.width() as usize + 2;
        let height = bbox.height() as usize + 2;
        let mut cells = vec![false; width * height];
        for &(c, r) in pixels {
            let row = (r - bbox.min_row) as usize + 1;
            let col = (c - bbox.min_col) as usize + 1;
            cells[row * width + col] = true;
        }
        Self {
            cells,
            width,
            height,
        }
    }

    fn at(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.width + col]
    }

    /// Configuration-weighted border length.
    ///
    /// A border pixel is a foreground pixel with at least one
    /// 4-connected background neighbor. Each border pixel is scored by
    /// its surrounding border pixels — `1 + 2·n₄ + 10·n_diag` — and
    /// that score selects a length contribution: straight runs count
    /// 1, diagonal runs `√2`, corner transitions `(1 + √2) / 2`.
    fn weighted_perimeter(&self) -> f64 {
        let sqrt2 = std::f64::consts::SQRT_2;
        let mut contribution = [0.0_f64; 50];
        for score in [5, 7, 15, 17, 25, 27] {
            contribution[score] = 1.0;
        }
        for score in [21, 33] {
            contribution[score] = sqrt2;
        }
        for score in [13, 23] {
            contribution[score] = (1.0 + sqrt2) / 2.0;
        }

        let mut border = vec![false; self.cells.len()];
        for row in 1..self.height - 1 {
            for col in 1..self.width - 1 {
                if !self.at(row, col) {
                    continue;
                }
                let interior = self.at(row - 1, col)
                    && self.at(row + 1, col)
                    && self.at(row, col - 1)
                    && self.at(row, col + 1);
                border[row * self.width + col] = !interior;
            }
        }
        let border_at = |row: usize, col: usize| border[row * self.width + col];

        let mut total = 0.0;
        for row in 1..self.height - 1 {
            for col in 1..self.width - 1 {
                if !border_at(row, col) {
                    continue;
                }
                let straight = usize::from(border_at(row - 1, col))
                    + usize::from(border_at(row + 1, col))
                    + usize::from(border_at(row, col - 1))
                    + usize::from(border_at(row, col + 1));
                let diagonal = usize::from(border_at(row - 1, col - 1))
                    + usize::from(border_at(row - 1, col + 1))
                    + usize::from(border_at(row + 1, col - 1))
                    + usize::from(border_at(row + 1, col + 1));
                total += contribution[1 + 2 * straight + 10 * diagonal];
            }
        }
        total
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Mask with a filled axis-aligned rectangle.
    fn rect_mask(size: u32, x0: u32, y0: u32, w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if x >= x0 && x < x0 + w && y >= y0 && y < y0 + h {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Mask with a filled disk.
    fn disk_mask(size: u32, cx: i64, cy: i64, radius: i64) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let dx = i64::from(x) - cx;
            let dy = i64::from(y) - cy;
            if dx * dx + dy * dy <= radius * radius {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn square_region_descriptor() {
        let regions = extract(&rect_mask(20, 5, 5, 10, 10)).unwrap();
        assert_eq!(regions.len(), 1);
        let region = &regions[0];

        assert_eq!(region.area, 100);
        // All 36 border pixels of an axis-aligned square sit on
        // straight runs, each contributing exactly 1.
        assert!((region.perimeter - 36.0).abs() < 1e-9);
        // Fourfold symmetry: both moment eigenvalues are equal.
        assert!(region.eccentricity.abs() < 1e-9);
        // A convex region is its own hull.
        assert!((region.solidity - 1.0).abs() < 1e-9);
        assert_eq!(
            region.bounding_box,
            BoundingBox {
                min_row: 5,
                min_col: 5,
                max_row: 15,
                max_col: 15,
            },
        );
    }

    #[test]
    fn elongated_region_has_high_eccentricity() {
        let regions = extract(&rect_mask(30, 2, 10, 24, 2)).unwrap();
        assert_eq!(regions.len(), 1);
        assert!(
            regions[0].eccentricity > 0.9,
            "expected elongated bar, got eccentricity {}",
            regions[0].eccentricity,
        );
    }

    #[test]
    fn concave_region_has_reduced_solidity() {
        // A plus-shaped region: its hull fills the corner notches.
        let mask = GrayImage::from_fn(30, 30, |x, y| {
            let horizontal = (10..20).contains(&x) && (13..17).contains(&y);
            let vertical = (13..17).contains(&x) && (10..20).contains(&y);
            if horizontal || vertical {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let regions = extract(&mask).unwrap();
        assert_eq!(regions.len(), 1);
        let solidity = regions[0].solidity;
        assert!(
            solidity > 0.0 && solidity < 1.0,
            "expected solidity in (0, 1), got {solidity}",
        );
    }

    #[test]
    fn disk_descriptor_matches_circle_geometry() {
        let regions = extract(&disk_mask(100, 50, 50, 30)).unwrap();
        assert_eq!(regions.len(), 1);
        let region = &regions[0];

        // pi * 30^2 = 2827, rasterized.
        assert!((2700..=2900).contains(&region.area));
        // 2 * pi * 30 = 188.5.
        assert!(
            (170.0..=205.0).contains(&region.perimeter),
            "perimeter {} outside circle estimate",
            region.perimeter,
        );
        assert!(region.eccentricity < 0.1);
        assert!(region.solidity > 0.9);
    }

    #[test]
    fn descriptor_ranges_hold_for_varied_shapes() {
        let masks = [
            rect_mask(40, 3, 3, 30, 8),
            disk_mask(60, 30, 30, 12),
            rect_mask(25, 10, 2, 2, 20),
        ];
        for mask in &masks {
            for region in extract(mask).unwrap() {
                assert!(region.area > 0);
                assert!(region.perimeter > 0.0);
                assert!((0.0..=1.0).contains(&region.eccentricity));
                assert!(region.solidity > 0.0 && region.solidity <= 1.0);
            }
        }
    }

    #[test]
    fn components_emitted_in_label_order() {
        // Two disjoint blobs: the one encountered first in raster
        // order gets the lower label.
        let mut mask = rect_mask(60, 5, 5, 10, 10);
        for y in 40..50 {
            for x in 40..50 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let regions = extract(&mask).unwrap();
        assert_eq!(regions.len(), 2);
        assert!(regions[0].bounding_box.min_row < regions[1].bounding_box.min_row);
    }

    #[test]
    fn empty_mask_yields_no_regions() {
        let regions = extract(&GrayImage::new(30, 30)).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn single_pixel_component_is_degenerate() {
        let mut mask = GrayImage::new(10, 10);
        mask.put_pixel(4, 4, Luma([255]));
        let result = extract(&mask);
        assert!(matches!(
            result,
            Err(AnalysisError::DegenerateRegion { label: 1 }),
        ));
    }
}
