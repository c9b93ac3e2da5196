//! Textual reporting over a classified region table.
//!
//! Produces two human-readable blocks from one [`AnalysisResult`]:
//!
//! - a **technical listing** — one block per cell with its derived
//!   category and raw metrics;
//! - a **clinical narrative** — aggregate statistics, anomaly
//!   observations, and threshold-driven recommendations.
//!
//! The derived cell *category* is intentionally distinct from the
//! classifier's *class*: blood categories re-map the class directly,
//! while urine categories re-derive from raw area and ignore the
//! large/normal split entirely. The two tiers answer different
//! questions (coarse size flag vs. cell-type guess) and are reported
//! side by side.

use serde::{Deserialize, Serialize};

use crate::types::{
    AnalysisError, AnalysisResult, CellClass, CellRecord, ClassificationThresholds, Region,
    SampleType, ThresholdTable,
};

/// Urine regions below this area are reported as epithelial cells.
const EPITHELIAL_AREA_CUTOFF: u32 = 100;

/// Derived cell-type category used in report text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellCategory {
    /// Blood region classified as a red cell.
    RedBloodCells,
    /// Blood region classified as a white cell.
    WhiteBloodCells,
    /// Small urine region, presumed epithelial.
    EpithelialCells,
    /// Anything the category rules make no stronger guess about.
    Others,
}

impl std::fmt::Display for CellCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RedBloodCells => "red blood cells",
            Self::WhiteBloodCells => "white blood cells",
            Self::EpithelialCells => "epithelial cells",
            Self::Others => "others",
        };
        f.write_str(name)
    }
}

/// Derive the reported category for one record.
///
/// Blood re-maps the classifier's label; urine re-derives from raw
/// area and deliberately ignores the classifier's large/normal label.
#[must_use]
pub const fn categorize(sample_type: SampleType, record: &CellRecord) -> CellCategory {
    match sample_type {
        SampleType::Blood => match record.class() {
            CellClass::RedCell => CellCategory::RedBloodCells,
            CellClass::WhiteCell | CellClass::Large | CellClass::Normal => {
                CellCategory::WhiteBloodCells
            }
        },
        SampleType::Urine => {
            if record.region().area < EPITHELIAL_AREA_CUTOFF {
                CellCategory::EpithelialCells
            } else {
                CellCategory::Others
            }
        }
    }
}

/// Mean, median, and sample standard deviation of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Middle value (average of the two middle values for even
    /// counts).
    pub median: f64,
    /// Sample standard deviation (n − 1 denominator); `0.0` when
    /// fewer than two values exist.
    pub std_dev: f64,
}

impl MetricStats {
    /// Compute stats over a non-empty slice of values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            f64::midpoint(sorted[mid - 1], sorted[mid])
        } else {
            sorted[mid]
        };

        let std_dev = if values.len() < 2 {
            0.0
        } else {
            let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
            (sum_sq / (n - 1.0)).sqrt()
        };

        Self {
            mean,
            median,
            std_dev,
        }
    }
}

/// The two report blocks produced from one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Per-cell technical listing.
    pub technical: String,
    /// Statistics, clinical summary, and recommendations.
    pub narrative: String,
}

impl Report {
    /// Generate both report blocks.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptyResult`] if the result contains
    /// no records.
    pub fn generate(
        result: &AnalysisResult,
        thresholds: &ThresholdTable,
    ) -> Result<Self, AnalysisError> {
        if result.is_empty() {
            return Err(AnalysisError::EmptyResult);
        }

        let technical = technical_listing(result);
        let narrative = [
            global_statistics(result),
            clinical_summary(result, thresholds),
            recommendations(result, thresholds),
        ]
        .join("\n");

        Ok(Self {
            technical,
            narrative,
        })
    }
}

/// One block per record: derived category, raw metrics, raw class.
fn technical_listing(result: &AnalysisResult) -> String {
    let mut lines = vec!["Detailed cell analysis report:".to_owned(), String::new()];

    for (index, record) in result.records().iter().enumerate() {
        let category = categorize(result.sample_type(), record);
        let region = record.region();
        lines.push(format!("Cell {} ({category}):", index + 1));
        lines.push(format!("  - Area: {} square units", region.area));
        lines.push(format!("  - Perimeter: {:.2} units", region.perimeter));
        lines.push(format!("  - Eccentricity: {:.2}", region.eccentricity));
        lines.push(format!("  - Solidity: {:.2}", region.solidity));
        lines.push(format!("  - Class: {}", record.class()));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Mean, median, and standard deviation of every metric.
fn global_statistics(result: &AnalysisResult) -> String {
    let records = result.records();
    let areas: Vec<f64> = records.iter().map(|r| f64::from(r.region().area)).collect();
    let perimeters: Vec<f64> = records.iter().map(|r| r.region().perimeter).collect();
    let eccentricities: Vec<f64> = records.iter().map(|r| r.region().eccentricity).collect();
    let solidities: Vec<f64> = records.iter().map(|r| r.region().solidity).collect();

    let area = MetricStats::of(&areas);
    let perimeter = MetricStats::of(&perimeters);
    let eccentricity = MetricStats::of(&eccentricities);
    let solidity = MetricStats::of(&solidities);

    let lines = vec![
        "Global statistics:".to_owned(),
        String::new(),
        format!("Total cells analyzed: {}", records.len()),
        format!("Mean cell area: {:.2} square units", area.mean),
        format!("Mean cell perimeter: {:.2} units", perimeter.mean),
        format!("Mean cell eccentricity: {:.2}", eccentricity.mean),
        format!("Mean cell solidity: {:.2}", solidity.mean),
        String::new(),
        format!("Median cell area: {:.2} square units", area.median),
        format!("Median cell perimeter: {:.2} units", perimeter.median),
        format!("Median cell eccentricity: {:.2}", eccentricity.median),
        format!("Median cell solidity: {:.2}", solidity.median),
        String::new(),
        format!("Cell area standard deviation: {:.2} square units", area.std_dev),
        format!(
            "Cell perimeter standard deviation: {:.2} units",
            perimeter.std_dev,
        ),
        format!(
            "Cell eccentricity standard deviation: {:.2}",
            eccentricity.std_dev,
        ),
        format!("Cell solidity standard deviation: {:.2}", solidity.std_dev),
        String::new(),
    ];

    lines.join("\n")
}

/// Counts per category, the anomaly tally, and one observation line
/// per anomalous record.
///
/// A record is an anomaly iff its class is [`CellClass::Large`].
/// Blood classification never emits that label, so the anomaly count
/// is structurally zero for blood samples — anomalies there are
/// conveyed through the cell-type distribution instead.
fn clinical_summary(result: &AnalysisResult, thresholds: &ThresholdTable) -> String {
    let t = thresholds.get(result.sample_type());

    let mut counts: [(CellCategory, usize); 4] = [
        (CellCategory::RedBloodCells, 0),
        (CellCategory::WhiteBloodCells, 0),
        (CellCategory::EpithelialCells, 0),
        (CellCategory::Others, 0),
    ];
    let mut anomaly_count = 0;
    let mut observation_lines = Vec::new();

    for (index, record) in result.records().iter().enumerate() {
        let category = categorize(result.sample_type(), record);
        for entry in &mut counts {
            if entry.0 == category {
                entry.1 += 1;
            }
        }

        if record.class() == CellClass::Large {
            anomaly_count += 1;
            observation_lines.push(format!(
                "Cell {} ({category}): {}",
                index + 1,
                observations(record.region(), t),
            ));
        }
    }

    let mut lines = vec![
        "Clinical summary of observations:".to_owned(),
        String::new(),
        format!("Total cells: {}", result.len()),
        format!("Total anomalies: {anomaly_count}"),
        String::new(),
        "Cell quantification:".to_owned(),
    ];
    for (category, count) in counts {
        lines.push(format!("  - {category}: {count}"));
    }
    lines.push(String::new());
    lines.extend(observation_lines);
    lines.push(String::new());

    lines.join("\n")
}

/// Free-text observations for one anomalous region, one note per
/// threshold breach, concatenated with spaces.
fn observations(region: &Region, t: &ClassificationThresholds) -> String {
    let mut notes = Vec::new();
    if f64::from(region.area) >= t.area {
        notes.push("Elevated area, possibly indicating inflammation or hypertrophy.");
    }
    if region.perimeter >= t.perimeter {
        notes.push("Elevated perimeter, possibly indicating an irregular shape.");
    }
    if region.eccentricity >= t.eccentricity {
        notes.push("High eccentricity, suggesting an elongated or irregular shape.");
    }
    if region.solidity <= t.solidity {
        notes.push("Low solidity, possibly indicating a compromised cell structure.");
    }
    notes.join(" ")
}

/// Per-metric recommendations from mean-vs-threshold comparison,
/// closed by a referral remark.
fn recommendations(result: &AnalysisResult, thresholds: &ThresholdTable) -> String {
    let t = thresholds.get(result.sample_type());
    let records = result.records();

    #[allow(clippy::cast_precision_loss)]
    let mean = |metric: fn(&Region) -> f64| {
        records.iter().map(|r| metric(r.region())).sum::<f64>() / records.len() as f64
    };

    let mut lines = vec!["Clinical recommendations:".to_owned(), String::new()];

    if mean(|r| f64::from(r.area)) > t.area {
        lines.push(
            "- Mean cell area is elevated. This may indicate generalized inflammation \
             or hypertrophy."
                .to_owned(),
        );
    }
    if mean(|r| r.perimeter) > t.perimeter {
        lines.push(
            "- Mean cell perimeter is elevated. This may indicate a general irregularity \
             in cell shape."
                .to_owned(),
        );
    }
    if mean(|r| r.eccentricity) > t.eccentricity {
        lines.push(
            "- Mean cell eccentricity is elevated. This may suggest cells with a more \
             elongated or irregular shape."
                .to_owned(),
        );
    }
    if mean(|r| r.solidity) < t.solidity {
        lines.push(
            "- Mean cell solidity is low. This may indicate a compromised cell structure."
                .to_owned(),
        );
    }
    lines.push(String::new());
    lines.push(
        "A specialist should be consulted for a more thorough evaluation and a detailed \
         discussion of the results."
            .to_owned(),
    );

    lines.join("\n")
}
