//! Rule-based classification of measured regions.
//!
//! Pure threshold logic, no learned components: the same region,
//! sample type, and threshold table always produce the same label,
//! and every region receives exactly one label.

use crate::types::{CellClass, CellRecord, Region, SampleType, ThresholdTable};

/// Label each region according to the sample type's rules.
///
/// Blood: a region is a [`CellClass::RedCell`] iff it is
/// simultaneously small (`area < T.area`), short-boundaried
/// (`perimeter < T.perimeter`), round (`eccentricity <
/// T.eccentricity`), and compact (`solidity > T.solidity`); anything
/// else is a [`CellClass::WhiteCell`].
///
/// Urine: a region is [`CellClass::Large`] iff `area > T.area`, else
/// [`CellClass::Normal`].
///
/// Records preserve the input order.
#[must_use]
pub fn classify(
    regions: Vec<Region>,
    sample_type: SampleType,
    thresholds: &ThresholdTable,
) -> Vec<CellRecord> {
    let t = thresholds.get(sample_type);
    regions
        .into_iter()
        .map(|region| {
            let class = match sample_type {
                SampleType::Blood => {
                    if f64::from(region.area) < t.area
                        && region.perimeter < t.perimeter
                        && region.eccentricity < t.eccentricity
                        && region.solidity > t.solidity
                    {
                        CellClass::RedCell
                    } else {
                        CellClass::WhiteCell
                    }
                }
                SampleType::Urine => {
                    if f64::from(region.area) > t.area {
                        CellClass::Large
                    } else {
                        CellClass::Normal
                    }
                }
            };
            CellRecord::new(region, class)
        })
        .collect()
}
