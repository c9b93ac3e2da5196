//! Foreground/background segmentation of candidate cell regions.
//!
//! Reduces the normalized image to luminance, smooths it with a
//! Gaussian kernel to suppress pixel noise, binarizes it with an
//! automatically chosen global threshold, and removes components too
//! small to be cells.
//!
//! Thresholding is *inverted*: stained cells render darker than the
//! background, so the foreground is everything at or below the Otsu
//! level. The output mask uses 255 for candidate-cell pixels and 0
//! for background.

use image::Luma;
use imageproc::contrast::{self, ThresholdType};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::types::{GrayImage, MIN_REGION_AREA, RgbImage};

/// Gaussian smoothing sigma, the continuous equivalent of the
/// classical 5×5 discrete kernel (`0.3 * ((5 - 1) * 0.5 - 1) + 0.8`).
pub const SMOOTHING_SIGMA: f32 = 1.1;

/// Segment candidate cell regions out of a normalized image.
///
/// Deterministic: the same input always produces the same mask. The
/// returned mask has the same spatial dimensions as the input.
#[must_use = "returns the binary foreground mask"]
pub fn segment(image: &RgbImage) -> GrayImage {
    let gray = image::imageops::grayscale(image);
    let smoothed = imageproc::filter::gaussian_blur_f32(&gray, SMOOTHING_SIGMA);

    let level = contrast::otsu_level(&smoothed);
    let mask = contrast::threshold(&smoothed, level, ThresholdType::BinaryInverted);

    remove_small_components(&mask, MIN_REGION_AREA)
}

/// Remove 8-connected foreground components smaller than `min_area`
/// pixels.
///
/// Pixels belonging to an undersized component are reset to
/// background; everything else is preserved unchanged.
#[must_use = "returns the cleaned mask"]
pub fn remove_small_components(mask: &GrayImage, min_area: u32) -> GrayImage {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0_u8]));

    let mut counts: Vec<u32> = Vec::new();
    for pixel in labels.pixels() {
        let label = pixel.0[0] as usize;
        if label == 0 {
            continue;
        }
        if label >= counts.len() {
            counts.resize(label + 1, 0);
        }
        counts[label] += 1;
    }

    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let label = labels.get_pixel(x, y).0[0] as usize;
        if label > 0 && counts[label] >= min_area {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
