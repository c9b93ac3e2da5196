//! cellscope-pipeline: Cell analysis pipeline for micrographs (sans-IO).
//!
//! Locates cell-like regions in a decoded microscope photograph of a
//! blood or urine sample and turns them into classified records,
//! textual reports, and an annotated overlay through:
//! contrast normalization -> segmentation -> feature extraction ->
//! classification, with reporting and highlighting over the result.
//!
//! This crate has **no interactive I/O dependencies** -- it operates
//! on in-memory pixel grids and returns structured data. Decoding and
//! encoding raster formats is delegated to the `image` crate; windows
//! and file pickers belong to the caller.

pub mod classify;
pub mod features;
pub mod highlight;
pub mod preprocess;
pub mod report;
pub mod segment;
pub mod session;
pub mod types;

pub use report::{CellCategory, MetricStats, Report};
pub use session::Analyzer;
pub use types::{
    AnalysisError, AnalysisResult, BoundingBox, CellClass, CellRecord, ClassificationThresholds,
    GrayImage, MIN_REGION_AREA, Region, RgbImage, SampleType, ThresholdTable,
};

/// Run the full analysis pipeline on a decoded image.
///
/// Stateless companion to [`Analyzer`]: callers that do not need a
/// session hand in an image and get a complete [`AnalysisResult`]
/// back, with no stored state on either side.
///
/// # Pipeline steps
///
/// 1. Contrast normalization (CLAHE on the lightness channel)
/// 2. Segmentation (smoothing, inverted Otsu threshold, noise floor)
/// 3. Feature extraction (per-component geometric descriptors)
/// 4. Classification (sample-type threshold rules)
///
/// # Errors
///
/// Returns [`AnalysisError::DegenerateRegion`] if a labeled component
/// admits no finite descriptor. This cannot happen for masks produced
/// by the segmenter's size filter; it guards against malformed input.
pub fn analyze(
    image: &RgbImage,
    sample_type: SampleType,
    thresholds: &ThresholdTable,
) -> Result<AnalysisResult, AnalysisError> {
    let normalized = preprocess::normalize(image);
    let mask = segment::segment(&normalized);
    let regions = features::extract(&mask)?;
    let records = classify::classify(regions, sample_type, thresholds);
    Ok(AnalysisResult::new(sample_type, records))
}
