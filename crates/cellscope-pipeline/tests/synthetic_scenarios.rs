//! End-to-end scenarios over synthetic micrographs.
//!
//! Each test builds an image (or mask) with known geometry and drives
//! the public pipeline surface, checking classification, anomaly
//! accounting, and error behavior against the values the geometry
//! dictates.

#![allow(clippy::unwrap_used)]

use cellscope_pipeline::{
    Analyzer, BoundingBox, CellClass, ClassificationThresholds, GrayImage, MIN_REGION_AREA,
    Region, RgbImage, SampleType, ThresholdTable, analyze, classify, features, segment,
};
use image::{Luma, Rgb};

/// White background with one filled dark disk.
fn disk_image(size: u32, cx: i64, cy: i64, radius: i64) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let dx = i64::from(x) - cx;
        let dy = i64::from(y) - cy;
        if dx * dx + dy * dy <= radius * radius {
            Rgb([30, 30, 30])
        } else {
            Rgb([230, 230, 230])
        }
    })
}

/// Paint an extra filled dark disk onto an existing image.
fn add_disk(image: &mut RgbImage, cx: i64, cy: i64, radius: i64) {
    for y in 0..image.height() {
        for x in 0..image.width() {
            let dx = i64::from(x) - cx;
            let dy = i64::from(y) - cy;
            if dx * dx + dy * dy <= radius * radius {
                image.put_pixel(x, y, Rgb([30, 30, 30]));
            }
        }
    }
}

#[test]
fn urine_disk_is_one_large_region_with_one_anomaly() {
    // A disk of radius 30 (area ~2827) under urine defaults
    // (area cutoff 150) is a single "large" region and the clinical
    // summary counts exactly one anomaly.
    let mut analyzer = Analyzer::new();
    let result = analyzer
        .analyze(disk_image(200, 100, 100, 30), SampleType::Urine)
        .unwrap();

    assert_eq!(result.len(), 1);
    let record = &result.records()[0];
    assert!(record.region().area > 150);
    assert_eq!(record.class(), CellClass::Large);

    let report = analyzer.generate_report().unwrap();
    assert!(report.narrative.contains("Total anomalies: 1"));
}

#[test]
fn blood_disk_metrics_satisfy_every_red_cell_bound() {
    // A radius-30 disk: area 2827 < 3000, near-zero eccentricity,
    // solidity > 0.85, boundary below 150 under the blood defaults.
    let region = Region {
        area: 2827,
        perimeter: 128.0,
        eccentricity: 0.03,
        solidity: 0.97,
        bounding_box: BoundingBox {
            min_row: 70,
            min_col: 70,
            max_row: 131,
            max_col: 131,
        },
    };
    let records = classify::classify(vec![region], SampleType::Blood, &ThresholdTable::default());
    assert_eq!(records[0].class(), CellClass::RedCell);
}

#[test]
fn blood_disk_end_to_end_is_red_cell_with_zero_anomalies() {
    let mut analyzer = Analyzer::new();
    let result = analyzer
        .analyze(disk_image(200, 100, 100, 20), SampleType::Blood)
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.records()[0].class(), CellClass::RedCell);

    // The blood path never emits the "large" label, so the anomaly
    // counter stays at zero no matter what the regions look like.
    let report = analyzer.generate_report().unwrap();
    assert!(report.narrative.contains("Total anomalies: 0"));
}

#[test]
fn unknown_sample_type_fails_without_touching_state() {
    let mut analyzer = Analyzer::new();
    analyzer
        .analyze(disk_image(200, 100, 100, 30), SampleType::Urine)
        .unwrap();

    // The boundary rejects the tag before any pipeline work starts.
    let parsed = "plasma".parse::<SampleType>();
    assert!(parsed.is_err());
    assert_eq!(analyzer.current_result().unwrap().len(), 1);
}

#[test]
fn report_before_any_analysis_fails_with_empty_result() {
    let analyzer = Analyzer::new();
    let report = analyzer.generate_report();
    assert!(report.is_err());
    assert_eq!(
        report.unwrap_err().to_string(),
        "no analysis result available; run an analysis first",
    );
}

#[test]
fn noise_blob_below_the_floor_is_discarded() {
    // Two disjoint blobs of 50 and 200 pixels: only the larger
    // survives the 150-pixel noise floor.
    let mut mask = GrayImage::new(80, 80);
    for y in 5..10 {
        for x in 5..15 {
            mask.put_pixel(x, y, Luma([255])); // 10x5 = 50 px
        }
    }
    for y in 40..50 {
        for x in 40..60 {
            mask.put_pixel(x, y, Luma([255])); // 20x10 = 200 px
        }
    }

    let cleaned = segment::remove_small_components(&mask, MIN_REGION_AREA);
    let regions = features::extract(&cleaned).unwrap();
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].area, 200);
}

#[test]
fn speck_is_discarded_end_to_end() {
    // A radius-3 speck next to a radius-30 cell: only the cell
    // survives segmentation.
    let mut img = disk_image(200, 100, 100, 30);
    add_disk(&mut img, 20, 20, 3);

    let result = analyze(&img, SampleType::Urine, &ThresholdTable::default()).unwrap();
    assert_eq!(result.len(), 1);
    assert!(result.records()[0].region().area > 2000);
}

#[test]
fn two_cells_are_reported_in_labeling_order() {
    let mut img = disk_image(220, 60, 60, 25);
    add_disk(&mut img, 160, 160, 30);

    let mut analyzer = Analyzer::new();
    let result = analyzer.analyze(img, SampleType::Urine).unwrap();

    assert_eq!(result.len(), 2);
    // Discovery order is raster order: the upper-left disk first.
    let first = result.records()[0].region().bounding_box;
    let second = result.records()[1].region().bounding_box;
    assert!(first.min_row < second.min_row);

    let report = analyzer.generate_report().unwrap();
    assert!(report.narrative.contains("Total cells: 2"));
    assert!(report.narrative.contains("Total anomalies: 2"));
    assert!(report.technical.contains("Cell 1 ("));
    assert!(report.technical.contains("Cell 2 ("));
}

#[test]
fn custom_threshold_table_substitutes_wholesale() {
    // With an absurdly large urine area cutoff the same disk flips
    // from large to normal.
    let strict = ThresholdTable::new(
        *ThresholdTable::default().get(SampleType::Blood),
        ClassificationThresholds {
            area: 1_000_000.0,
            perimeter: 70.0,
            eccentricity: 0.6,
            solidity: 0.75,
        },
    );
    let mut analyzer = Analyzer::with_thresholds(strict);
    let result = analyzer
        .analyze(disk_image(200, 100, 100, 30), SampleType::Urine)
        .unwrap();
    assert_eq!(result.records()[0].class(), CellClass::Normal);

    let report = analyzer.generate_report().unwrap();
    assert!(report.narrative.contains("Total anomalies: 0"));
}

#[test]
fn descriptor_invariants_hold_end_to_end() {
    let mut img = disk_image(220, 60, 60, 25);
    add_disk(&mut img, 150, 150, 35);

    let result = analyze(&img, SampleType::Blood, &ThresholdTable::default()).unwrap();
    assert!(!result.is_empty());
    for record in result.records() {
        let region = record.region();
        assert!(region.area >= MIN_REGION_AREA);
        assert!(region.perimeter > 0.0);
        assert!((0.0..=1.0).contains(&region.eccentricity));
        assert!(region.solidity > 0.0 && region.solidity <= 1.0);
        assert!(region.bounding_box.min_row < region.bounding_box.max_row);
        assert!(region.bounding_box.min_col < region.bounding_box.max_col);
        assert!(region.bounding_box.max_row <= 220);
        assert!(region.bounding_box.max_col <= 220);
    }
}

#[test]
fn annotated_overlay_marks_the_cell_box() {
    let mut analyzer = Analyzer::new();
    analyzer
        .analyze(disk_image(200, 100, 100, 30), SampleType::Urine)
        .unwrap();

    let annotated = analyzer.annotated().unwrap();
    let bbox = analyzer.current_result().unwrap().records()[0]
        .region()
        .bounding_box;

    // Urine classes draw in the blue fallback color.
    assert_eq!(
        *annotated.get_pixel(bbox.min_col, bbox.min_row),
        Rgb([0, 0, 255]),
    );
}
