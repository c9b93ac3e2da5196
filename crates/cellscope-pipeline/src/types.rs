//! Shared types for the cellscope analysis pipeline.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference binary
/// masks without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference decoded
/// and annotated images without depending on `image` directly.
pub use image::RgbImage;

/// Connected components smaller than this many pixels are removed
/// during segmentation. Anything below the floor is assumed to be
/// stain debris or sensor noise rather than a cell.
pub const MIN_REGION_AREA: u32 = 150;

/// The kind of biological sample the image was taken from.
///
/// A closed enumeration: every analysis is performed for exactly one
/// of these, and threshold lookup is total over the variants. Unknown
/// sample-type strings are rejected at parse time with
/// [`AnalysisError::UnsupportedSampleType`] — there is no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    /// Blood smear. Regions classify as red or white cells.
    Blood,
    /// Urine sediment. Regions classify as large or normal.
    Urine,
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blood => write!(f, "blood"),
            Self::Urine => write!(f, "urine"),
        }
    }
}

impl FromStr for SampleType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blood" => Ok(Self::Blood),
            "urine" => Ok(Self::Urine),
            _ => Err(AnalysisError::UnsupportedSampleType(s.to_owned())),
        }
    }
}

/// Per-metric cutoffs used by the classifier and the report generator.
///
/// The same four metrics are measured for every region; what the
/// cutoffs *mean* depends on the sample type (see
/// [`classify`](crate::classify)).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationThresholds {
    /// Region area cutoff in pixels.
    pub area: f64,
    /// Region boundary length cutoff in pixels.
    pub perimeter: f64,
    /// Elongation cutoff, in `[0, 1]`.
    pub eccentricity: f64,
    /// Convex-hull fill-ratio cutoff, in `(0, 1]`.
    pub solidity: f64,
}

/// The full per-sample-type threshold table.
///
/// Exactly one [`ClassificationThresholds`] record per [`SampleType`].
/// The table is immutable after construction and can only be replaced
/// wholesale — per-field overrides are not supported, so a custom
/// table is always internally consistent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    blood: ClassificationThresholds,
    urine: ClassificationThresholds,
}

impl ThresholdTable {
    /// Build a table from explicit per-sample-type records.
    #[must_use]
    pub const fn new(blood: ClassificationThresholds, urine: ClassificationThresholds) -> Self {
        Self { blood, urine }
    }

    /// Look up the thresholds for a sample type.
    ///
    /// Total over the enum: unknown sample types cannot reach this
    /// point because they are rejected when parsing the tag.
    #[must_use]
    pub const fn get(&self, sample_type: SampleType) -> &ClassificationThresholds {
        match sample_type {
            SampleType::Blood => &self.blood,
            SampleType::Urine => &self.urine,
        }
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            blood: ClassificationThresholds {
                area: 3000.0,
                perimeter: 150.0,
                eccentricity: 0.7,
                solidity: 0.85,
            },
            urine: ClassificationThresholds {
                area: 150.0,
                perimeter: 70.0,
                eccentricity: 0.6,
                solidity: 0.75,
            },
        }
    }
}

/// Minimal axis-aligned rectangle enclosing a region.
///
/// Half-open on both axes: rows span `min_row..max_row` and columns
/// span `min_col..max_col`, so `min_row < max_row` and
/// `min_col < max_col` for any non-empty region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// First row containing the region.
    pub min_row: u32,
    /// First column containing the region.
    pub min_col: u32,
    /// One past the last row containing the region.
    pub max_row: u32,
    /// One past the last column containing the region.
    pub max_col: u32,
}

impl BoundingBox {
    /// Height of the box in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.max_row - self.min_row
    }

    /// Width of the box in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.max_col - self.min_col
    }
}

/// Geometric descriptor of one connected foreground component.
///
/// Produced by [`features::extract`](crate::features::extract). The
/// estimators behind `perimeter`, `eccentricity`, and `solidity` are
/// documented on that module — the classifier thresholds are
/// calibrated against those specific estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Pixel count. Always greater than zero.
    pub area: u32,
    /// Boundary length in pixels. Always greater than zero.
    pub perimeter: f64,
    /// Elongation of the best-fit ellipse, in `[0, 1]`.
    /// `0` is a circle; values approaching `1` are elongated.
    pub eccentricity: f64,
    /// Ratio of area to convex-hull area, in `(0, 1]`.
    /// Lower values indicate concave or ragged boundaries.
    pub solidity: f64,
    /// Minimal enclosing rectangle.
    pub bounding_box: BoundingBox,
}

/// Classifier output label for a region.
///
/// The variants partition by sample type: blood regions are `RedCell`
/// or `WhiteCell`, urine regions are `Large` or `Normal`. The stable
/// string forms (`"red-cell"` etc.) appear in reports and serialized
/// output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellClass {
    /// Small, round, compact blood region.
    RedCell,
    /// Any blood region failing the red-cell criteria.
    WhiteCell,
    /// Urine region above the area cutoff.
    Large,
    /// Urine region at or below the area cutoff.
    Normal,
}

impl CellClass {
    /// Stable string form of the label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RedCell => "red-cell",
            Self::WhiteCell => "white-cell",
            Self::Large => "large",
            Self::Normal => "normal",
        }
    }
}

impl std::fmt::Display for CellClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified region: the geometry plus the label the classifier
/// assigned to it. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    region: Region,
    class: CellClass,
}

impl CellRecord {
    /// Pair a region with its classifier label.
    #[must_use]
    pub const fn new(region: Region, class: CellClass) -> Self {
        Self { region, class }
    }

    /// The region's geometric descriptor.
    #[must_use]
    pub const fn region(&self) -> &Region {
        &self.region
    }

    /// The classifier's label.
    #[must_use]
    pub const fn class(&self) -> CellClass {
        self.class
    }
}

/// The output of one full pipeline run.
///
/// Records appear in labeling order, which is stable within a run.
/// A result is produced wholesale by [`analyze`](crate::analyze) and
/// never partially mutated; a later run replaces it entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    sample_type: SampleType,
    records: Vec<CellRecord>,
}

impl AnalysisResult {
    /// Assemble a result from classified records.
    #[must_use]
    pub const fn new(sample_type: SampleType, records: Vec<CellRecord>) -> Self {
        Self {
            sample_type,
            records,
        }
    }

    /// The sample type this analysis was run for.
    #[must_use]
    pub const fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    /// The classified records, in labeling order.
    #[must_use]
    pub fn records(&self) -> &[CellRecord] {
        &self.records
    }

    /// Number of classified records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no region survived segmentation.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Errors that can occur during analysis or reporting.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The requested sample type is not one of the supported kinds.
    #[error("unsupported sample type: {0:?} (use \"blood\" or \"urine\")")]
    UnsupportedSampleType(String),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageLoad(#[from] image::ImageError),

    /// A labeled component had geometry no descriptor can be computed
    /// for (e.g. a single pixel with a degenerate moment tensor).
    #[error("region {label} has degenerate geometry")]
    DegenerateRegion {
        /// The component's label id.
        label: u32,
    },

    /// A report or annotated image was requested before any
    /// successful analysis.
    #[error("no analysis result available; run an analysis first")]
    EmptyResult,

    /// Failed to encode or write the annotated image.
    #[error("failed to write annotated image: {0}")]
    ImageWrite(#[source] image::ImageError),
}
