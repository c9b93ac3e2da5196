//! Color-coded bounding-box overlay for visual review.
//!
//! Draws a rectangle over each classified region on a copy of the
//! *original* image (not the contrast-normalized one, which exists
//! only for segmentation). Colors follow the classifier label: green
//! for red cells, red for white cells, and blue for everything else —
//! both urine classes share the fallback.

use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::types::{AnalysisResult, CellClass, RgbImage};

/// Outline color for [`CellClass::RedCell`] regions.
pub const RED_CELL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Outline color for [`CellClass::WhiteCell`] regions.
pub const WHITE_CELL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Outline color for any other label.
pub const FALLBACK_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Outline thickness in pixels.
const OUTLINE_WIDTH: u32 = 2;

/// Draw a classified bounding box over each record.
///
/// Returns a new image; the input is never mutated.
#[must_use = "returns the annotated copy"]
pub fn annotate(image: &RgbImage, result: &AnalysisResult) -> RgbImage {
    let mut annotated = image.clone();

    for record in result.records() {
        let color = match record.class() {
            CellClass::RedCell => RED_CELL_COLOR,
            CellClass::WhiteCell => WHITE_CELL_COLOR,
            CellClass::Large | CellClass::Normal => FALLBACK_COLOR,
        };

        let bbox = record.region().bounding_box;
        // Nested one-pixel rectangles build up the outline width.
        for inset in 0..OUTLINE_WIDTH {
            let width = bbox.width().saturating_sub(2 * inset);
            let height = bbox.height().saturating_sub(2 * inset);
            if width == 0 || height == 0 {
                break;
            }
            #[allow(clippy::cast_possible_wrap)]
            let rect = Rect::at((bbox.min_col + inset) as i32, (bbox.min_row + inset) as i32)
                .of_size(width, height);
            draw_hollow_rect_mut(&mut annotated, rect, color);
        }
    }

    annotated
}
