use crate::analysis::metrics::best_overlap;
use crate::pipeline::types::DetectionRegion;
use crate::utils::geometry::ImageSize;
use serde::{Deserialize, Serialize};

/// Score of one detection result against ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub found_objects: usize,
    pub expected_objects: usize,
    /// Percent of each expected rectangle covered by its best match.
    pub per_object_percent: Vec<f64>,
    /// Covered share of the total expected area; `None` without ground truth.
    pub found_area_percent: Option<f64>,
    /// Detected area outside any expected rectangle, relative to the expected
    /// area (or to the scene area when nothing is expected).
    pub false_area_percent: f64,
    /// Detection score from 0 to 10.
    pub points: f64,
}

impl EvaluationReport {
    pub fn all_found(&self) -> bool {
        self.found_objects == self.expected_objects
    }
}

/// Score `found` against the `expected` rectangles.
///
/// With ground truth: up to 5 points for the share of objects found, up to 5
/// for the share of their area covered, minus one point per 10% of false
/// detection area. Without: 5 points minus one per reported region, 5 more
/// for reporting nothing, minus the false area as a percentage of the scene.
pub fn evaluate(found: &[DetectionRegion], expected: &[DetectionRegion], scene: ImageSize) -> EvaluationReport {
    let mut false_area: i64 = found.iter().map(DetectionRegion::area).sum();
    let mut found_area: i64 = 0;
    let mut expected_area: i64 = 0;
    let mut found_objects = 0;
    let mut per_object_percent = Vec::with_capacity(expected.len());

    for target in expected {
        let overlap = best_overlap(found, target).map_or(0, |(_, area)| area);
        let area = target.area();
        per_object_percent.push(if area > 0 {
            overlap as f64 * 100.0 / area as f64
        } else {
            0.0
        });
        found_area += overlap;
        expected_area += area;
        false_area -= overlap;
        if overlap > 0 {
            found_objects += 1;
        }
    }

    let (found_area_percent, false_area_percent, points) = if expected_area > 0 {
        let false_percent = false_area as f64 * 100.0 / expected_area as f64;
        let points = found_objects as f64 * 5.0 / expected.len() as f64
            + found_area as f64 * 5.0 / expected_area as f64
            - false_percent / 10.0;
        (
            Some(found_area as f64 * 100.0 / expected_area as f64),
            false_percent,
            points.max(0.0),
        )
    } else {
        let scene_area = (scene.width as i64 * scene.height as i64).max(1);
        let false_percent = false_area as f64 * 100.0 / scene_area as f64;
        let bonus = if found.is_empty() { 5.0 } else { 0.0 };
        let points = 5.0 - found.len() as f64 + bonus - false_percent;
        (None, false_percent, points.max(0.0))
    };

    EvaluationReport {
        found_objects,
        expected_objects: expected.len(),
        per_object_percent,
        found_area_percent,
        false_area_percent,
        points,
    }
}

/// Speed score: 10 points under 10 ms, falling linearly from 9.5 to 0
/// between 10 and 200 ms.
pub fn timing_points(elapsed_ms: f64) -> f64 {
    if elapsed_ms < 10.0 {
        10.0
    } else if elapsed_ms < 200.0 {
        (200.0 - elapsed_ms) * 5.0 / 100.0
    } else {
        0.0
    }
}
