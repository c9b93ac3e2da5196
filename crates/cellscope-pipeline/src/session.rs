//! Analysis session: one image, one result, replace-on-success.
//!
//! [`Analyzer`] holds the threshold table plus the most recent
//! successfully analyzed image and its result. A failed analysis
//! leaves both untouched — the new result is only swapped in after
//! the whole pipeline has succeeded, so reporting and annotation
//! always see a complete, consistent result.
//!
//! An `Analyzer` processes one image at a time and is not internally
//! synchronized. Concurrent callers need one instance each, or an
//! external lock.

use std::path::Path;

use crate::report::Report;
use crate::types::{AnalysisError, AnalysisResult, RgbImage, SampleType, ThresholdTable};

/// Stateful wrapper around the analysis pipeline.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    thresholds: ThresholdTable,
    image: Option<RgbImage>,
    result: Option<AnalysisResult>,
}

impl Analyzer {
    /// Create an analyzer with the default threshold table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with a custom threshold table.
    ///
    /// The table can only be substituted wholesale; there is no
    /// per-field override.
    #[must_use]
    pub const fn with_thresholds(thresholds: ThresholdTable) -> Self {
        Self {
            thresholds,
            image: None,
            result: None,
        }
    }

    /// The threshold table this analyzer classifies and reports with.
    #[must_use]
    pub const fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// The most recent successful analysis, if any.
    #[must_use]
    pub const fn current_result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Run the full pipeline on a decoded image and store the result.
    ///
    /// On success the stored image and result are replaced
    /// atomically; on failure both keep their previous values.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DegenerateRegion`] if feature
    /// extraction encounters impossible geometry.
    pub fn analyze(
        &mut self,
        image: RgbImage,
        sample_type: SampleType,
    ) -> Result<&AnalysisResult, AnalysisError> {
        let result = crate::analyze(&image, sample_type, &self.thresholds)?;
        self.image = Some(image);
        Ok(self.result.insert(result))
    }

    /// Decode raw image bytes, then [`analyze`](Self::analyze).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptyInput`] for an empty byte slice,
    /// [`AnalysisError::ImageLoad`] if the bytes are not a decodable
    /// image, or any error from [`analyze`](Self::analyze).
    pub fn analyze_bytes(
        &mut self,
        bytes: &[u8],
        sample_type: SampleType,
    ) -> Result<&AnalysisResult, AnalysisError> {
        if bytes.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        let image = image::load_from_memory(bytes)?.to_rgb8();
        self.analyze(image, sample_type)
    }

    /// Generate the technical and narrative report blocks for the
    /// current result.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptyResult`] if no analysis has
    /// succeeded yet, or if the last analysis found no regions.
    pub fn generate_report(&self) -> Result<Report, AnalysisError> {
        let result = self.result.as_ref().ok_or(AnalysisError::EmptyResult)?;
        Report::generate(result, &self.thresholds)
    }

    /// Produce the annotated copy of the analyzed image.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptyResult`] if no analysis has
    /// succeeded yet.
    pub fn annotated(&self) -> Result<RgbImage, AnalysisError> {
        match (&self.image, &self.result) {
            (Some(image), Some(result)) => Ok(crate::highlight::annotate(image, result)),
            _ => Err(AnalysisError::EmptyResult),
        }
    }

    /// Encode the annotated image to `path`.
    ///
    /// The format is chosen from the file extension by the codec
    /// collaborator (`image`).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptyResult`] if no analysis has
    /// succeeded yet, or [`AnalysisError::ImageWrite`] if encoding or
    /// writing fails.
    pub fn write_annotated(&self, path: &Path) -> Result<(), AnalysisError> {
        self.annotated()?
            .save(path)
            .map_err(AnalysisError::ImageWrite)
    }
}
