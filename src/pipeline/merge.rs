use super::types::DetectionRegion;

/// Fraction of the smaller region that must be covered before two regions
/// are treated as the same instance.
pub const MERGE_OVERLAP_RATIO: f64 = 0.75;

pub fn should_merge(a: &DetectionRegion, b: &DetectionRegion) -> bool {
    let smaller = a.area().min(b.area()) as f64;
    a.intersection_area(b) as f64 > smaller * MERGE_OVERLAP_RATIO
}

/// Insert `region`, folding it together with every existing region it
/// substantially overlaps.
///
/// The merged result takes the slot of the first absorbed region; the other
/// absorbed regions are removed. A region overlapping nothing is appended.
pub fn add_or_merge(regions: &mut Vec<DetectionRegion>, mut region: DetectionRegion) {
    let absorbed: Vec<usize> = regions
        .iter()
        .enumerate()
        .filter(|(_, existing)| should_merge(existing, &region))
        .map(|(index, _)| index)
        .collect();

    let Some((&first, rest)) = absorbed.split_first() else {
        regions.push(region);
        return;
    };

    for &index in &absorbed {
        region.absorb(&regions[index]);
    }
    regions[first] = region;

    // Indices in `rest` are ascending and all after `first`.
    for &index in rest.iter().rev() {
        regions.remove(index);
    }
}
