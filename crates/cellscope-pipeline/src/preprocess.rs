//! Local contrast normalization for unevenly illuminated micrographs.
//!
//! Converts the image to CIE L\*a\*b\*, applies contrast-limited
//! adaptive histogram equalization (CLAHE) to the lightness channel
//! only, and converts back to sRGB. Chromaticity is untouched, so
//! stain colors survive the normalization; only illumination is
//! flattened.
//!
//! Neither `image` nor `imageproc` ships a Lab conversion or CLAHE,
//! so both are implemented here. The Lab encoding follows the 8-bit
//! convention `L*255/100`, `a+128`, `b+128` with a D65 white point.

use crate::types::RgbImage;

/// CLAHE clip limit: per-bin histogram counts are capped at this
/// multiple of the uniform bin height before equalization.
pub const CLIP_LIMIT: f64 = 3.0;

/// CLAHE tile grid: the image is divided into this many tiles along
/// each axis, each equalized against its own local histogram.
pub const TILE_GRID: u32 = 8;

/// Normalize local contrast of an image.
///
/// Output has the same dimensions and channel count as the input.
/// Always succeeds for a valid image; a tile grid larger than the
/// image collapses to one tile per pixel row/column.
#[must_use = "returns the normalized image"]
pub fn normalize(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let pixel_count = (width as usize) * (height as usize);

    let mut lightness = vec![0_u8; pixel_count];
    let mut chroma_a = vec![0_u8; pixel_count];
    let mut chroma_b = vec![0_u8; pixel_count];

    for (i, pixel) in image.pixels().enumerate() {
        let [l, a, b] = lab8_from_srgb(pixel.0);
        lightness[i] = l;
        chroma_a[i] = a;
        chroma_b[i] = b;
    }

    let equalized = equalize_lightness(&lightness, width, height);

    let mut out = RgbImage::new(width, height);
    for (i, pixel) in out.pixels_mut().enumerate() {
        pixel.0 = srgb_from_lab8([equalized[i], chroma_a[i], chroma_b[i]]);
    }
    out
}

// ───────────────────────── Lab conversion ────────────────────────────

/// D65 reference white in XYZ.
const WHITE: [f64; 3] = [0.950_47, 1.0, 1.088_83];

/// CIE threshold between the cube-root and linear branches of the
/// Lab transfer function, `(6/29)^3`.
const LAB_EPSILON: f64 = 0.008_856;

/// Slope of the linear branch, `(29/6)^2 / 3`.
const LAB_KAPPA: f64 = 7.787;

fn srgb_to_linear(channel: u8) -> f64 {
    let c = f64::from(channel) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn linear_to_srgb(linear: f64) -> u8 {
    let c = if linear <= 0.003_130_8 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    };
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn lab_transfer(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_KAPPA.mul_add(t, 16.0 / 116.0)
    }
}

fn lab_transfer_inverse(t: f64) -> f64 {
    let cubed = t * t * t;
    if cubed > LAB_EPSILON {
        cubed
    } else {
        (t - 16.0 / 116.0) / LAB_KAPPA
    }
}

/// Convert one sRGB pixel to 8-bit-encoded L\*a\*b\*.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lab8_from_srgb(rgb: [u8; 3]) -> [u8; 3] {
    let r = srgb_to_linear(rgb[0]);
    let g = srgb_to_linear(rgb[1]);
    let b = srgb_to_linear(rgb[2]);

    let x = 0.412_4 * r + 0.357_6 * g + 0.180_5 * b;
    let y = 0.212_6 * r + 0.715_2 * g + 0.072_2 * b;
    let z = 0.019_3 * r + 0.119_2 * g + 0.950_5 * b;

    let fx = lab_transfer(x / WHITE[0]);
    let fy = lab_transfer(y / WHITE[1]);
    let fz = lab_transfer(z / WHITE[2]);

    let lightness = 116.0_f64.mul_add(fy, -16.0);
    let a = 500.0 * (fx - fy);
    let b = 200.0 * (fy - fz);

    [
        (lightness * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8,
        (a + 128.0).round().clamp(0.0, 255.0) as u8,
        (b + 128.0).round().clamp(0.0, 255.0) as u8,
    ]
}

/// Convert one 8-bit-encoded L\*a\*b\* pixel back to sRGB.
fn srgb_from_lab8(lab: [u8; 3]) -> [u8; 3] {
    let lightness = f64::from(lab[0]) * 100.0 / 255.0;
    let a = f64::from(lab[1]) - 128.0;
    let b = f64::from(lab[2]) - 128.0;

    let fy = (lightness + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = WHITE[0] * lab_transfer_inverse(fx);
    let y = WHITE[1] * lab_transfer_inverse(fy);
    let z = WHITE[2] * lab_transfer_inverse(fz);

    let r = 3.240_6 * x - 1.537_2 * y - 0.498_6 * z;
    let g = -0.968_9 * x + 1.875_8 * y + 0.041_5 * z;
    let bl = 0.055_7 * x - 0.204_0 * y + 1.057_0 * z;

    [linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(bl)]
}

// ───────────────────────── CLAHE ─────────────────────────────────────

/// Equalize a lightness plane with contrast-limited adaptive
/// histogram equalization.
///
/// The plane is divided into a [`TILE_GRID`]×[`TILE_GRID`] grid of
/// tiles. Each tile's histogram is clipped at [`CLIP_LIMIT`] times the
/// uniform bin height, the clipped excess is redistributed equally
/// across all bins, and the resulting cumulative distribution becomes
/// that tile's remapping function. Per-pixel output is the bilinear
/// interpolation of the four surrounding tile mappings, which removes
/// visible tile seams.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
fn equalize_lightness(plane: &[u8], width: u32, height: u32) -> Vec<u8> {
    let tiles_x = TILE_GRID.min(width).max(1) as usize;
    let tiles_y = TILE_GRID.min(height).max(1) as usize;
    let w = width as usize;
    let h = height as usize;

    // Tile boundaries distribute any remainder across the grid.
    let col_bound = |tx: usize| tx * w / tiles_x;
    let row_bound = |ty: usize| ty * h / tiles_y;

    let mut luts = vec![[0_u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (x0, x1) = (col_bound(tx), col_bound(tx + 1));
            let (y0, y1) = (row_bound(ty), row_bound(ty + 1));
            let tile_area = ((x1 - x0) * (y1 - y0)) as f64;

            let mut histogram = [0.0_f64; 256];
            for row in y0..y1 {
                for col in x0..x1 {
                    histogram[plane[row * w + col] as usize] += 1.0;
                }
            }

            // Clip and redistribute the excess uniformly.
            let clip = (CLIP_LIMIT * tile_area / 256.0).max(1.0);
            let mut excess = 0.0;
            for bin in &mut histogram {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            let bonus = excess / 256.0;

            let lut = &mut luts[ty * tiles_x + tx];
            let mut cumulative = 0.0;
            for (value, bin) in histogram.iter().enumerate() {
                cumulative += bin + bonus;
                lut[value] = (cumulative * 255.0 / tile_area).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    // Bilinear interpolation between the four nearest tile mappings,
    // clamped at the image border where only one or two tiles exist.
    let tile_index = |grid: f64, tiles: usize| -> (usize, usize, f64) {
        let base = grid.floor();
        let frac = grid - base;
        let i0 = (base as i64).clamp(0, tiles as i64 - 1) as usize;
        let i1 = (base as i64 + 1).clamp(0, tiles as i64 - 1) as usize;
        (i0, i1, frac.clamp(0.0, 1.0))
    };

    let mut out = vec![0_u8; plane.len()];
    for row in 0..h {
        let gy = (row as f64 + 0.5) * tiles_y as f64 / h as f64 - 0.5;
        let (ty0, ty1, wy) = tile_index(gy, tiles_y);
        for col in 0..w {
            let gx = (col as f64 + 0.5) * tiles_x as f64 / w as f64 - 0.5;
            let (tx0, tx1, wx) = tile_index(gx, tiles_x);

            let value = plane[row * w + col] as usize;
            let top = (1.0 - wx) * f64::from(luts[ty0 * tiles_x + tx0][value])
                + wx * f64::from(luts[ty0 * tiles_x + tx1][value]);
            let bottom = (1.0 - wx) * f64::from(luts[ty1 * tiles_x + tx0][value])
                + wx * f64::from(luts[ty1 * tiles_x + tx1][value]);
            out[row * w + col] = (1.0 - wy)
                .mul_add(top, wy * bottom)
                .round()
                .clamp(0.0, 255.0) as u8;
        }
    }
    out
}
