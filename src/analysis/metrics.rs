use crate::pipeline::types::DetectionRegion;

/// Intersection over union of two regions, 0 when both are empty.
pub fn intersection_over_union(a: &DetectionRegion, b: &DetectionRegion) -> f64 {
    let intersection = a.intersection_area(b);
    let union = a.area() + b.area() - intersection;
    if union <= 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Fraction of `expected` covered by `found`.
pub fn coverage(found: &DetectionRegion, expected: &DetectionRegion) -> f64 {
    let area = expected.area();
    if area == 0 {
        return 0.0;
    }
    found.intersection_area(expected) as f64 / area as f64
}

/// Index and intersection area of the found region overlapping `expected`
/// the most. The earliest region wins ties; no overlap gives `None`.
pub fn best_overlap(found: &[DetectionRegion], expected: &DetectionRegion) -> Option<(usize, i64)> {
    let mut best: Option<(usize, i64)> = None;
    for (index, region) in found.iter().enumerate() {
        let area = region.intersection_area(expected);
        if area > best.map_or(0, |(_, a)| a) {
            best = Some((index, area));
        }
    }
    best
}
