use crate::utils::geometry::{Affine2, Point2};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Size of the minimal sample that determines an affine map.
const MINIMAL_SAMPLE: usize = 3;

/// Attempts at drawing a non-degenerate minimal sample per iteration.
const MAX_SAMPLE_ATTEMPTS: usize = 100;

/// Configuration for RANSAC affine estimation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    pub max_iterations: usize,
    /// Maximum reprojection error (pixels) for a point to count as an inlier.
    pub reprojection_threshold: f64,
    pub confidence: f64,
    pub refine_iterations: usize,
    pub min_inliers: usize,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            reprojection_threshold: 3.0,
            confidence: 0.95,
            refine_iterations: 10,
            min_inliers: 4,
            seed: 0x5eed,
        }
    }
}

/// Result of RANSAC estimation
#[derive(Clone, Debug)]
pub struct AffineFit {
    pub transform: Affine2,
    /// One flag per input pair, `true` for inliers.
    pub inliers: Vec<bool>,
    pub inlier_count: usize,
}

/// Fit an affine map taking `src` onto `dst` while tolerating outliers.
///
/// Returns `None` when the input is too small, every sample is degenerate, or
/// the best model has fewer than `config.min_inliers` inliers.
pub fn estimate_affine_2d<R: Rng + ?Sized>(
    src: &[Point2],
    dst: &[Point2],
    config: &RansacConfig,
    rng: &mut R,
) -> Option<AffineFit> {
    let count = src.len().min(dst.len());
    if count < MINIMAL_SAMPLE {
        return None;
    }

    let threshold_sq = config.reprojection_threshold * config.reprojection_threshold;
    let mut best: Option<(Affine2, usize)> = None;
    let mut max_iterations = config.max_iterations;
    let mut iteration = 0;

    while iteration < max_iterations {
        iteration += 1;

        let Some(model) = sample_model(src, dst, count, rng) else {
            continue;
        };
        let inlier_count = count_inliers(&model, src, dst, threshold_sq);

        if best.map_or(true, |(_, best_count)| inlier_count > best_count) {
            best = Some((model, inlier_count));
            max_iterations = update_iteration_bound(
                config.confidence,
                (count - inlier_count) as f64 / count as f64,
                max_iterations,
            );
        }
    }

    let (mut model, _) = best?;
    let mut inliers = classify(&model, src, dst, threshold_sq);
    let mut inlier_count = inliers.iter().filter(|&&i| i).count();

    for _ in 0..config.refine_iterations {
        let Some(refined) = fit_least_squares(src, dst, &inliers) else {
            break;
        };
        let refined_inliers = classify(&refined, src, dst, threshold_sq);
        let refined_count = refined_inliers.iter().filter(|&&i| i).count();
        if refined_count < inlier_count {
            break;
        }
        let converged = refined_inliers == inliers;
        model = refined;
        inliers = refined_inliers;
        inlier_count = refined_count;
        if converged {
            break;
        }
    }

    if inlier_count < config.min_inliers.max(MINIMAL_SAMPLE) {
        return None;
    }

    Some(AffineFit {
        transform: model,
        inliers,
        inlier_count,
    })
}

/// Draw three distinct, non-collinear pairs and solve for the exact map.
fn sample_model<R: Rng + ?Sized>(
    src: &[Point2],
    dst: &[Point2],
    count: usize,
    rng: &mut R,
) -> Option<Affine2> {
    for _ in 0..MAX_SAMPLE_ATTEMPTS {
        let picked = rand::seq::index::sample(rng, count, MINIMAL_SAMPLE).into_vec();
        let s = [src[picked[0]], src[picked[1]], src[picked[2]]];
        let d = [dst[picked[0]], dst[picked[1]], dst[picked[2]]];
        if let Some(model) = solve_exact(&s, &d) {
            return Some(model);
        }
    }
    None
}

fn solve_exact(src: &[Point2; 3], dst: &[Point2; 3]) -> Option<Affine2> {
    let m = [
        [src[0].x, src[0].y, 1.0],
        [src[1].x, src[1].y, 1.0],
        [src[2].x, src[2].y, 1.0],
    ];
    let row_x = solve3(m, [dst[0].x, dst[1].x, dst[2].x])?;
    let row_y = solve3(m, [dst[0].y, dst[1].y, dst[2].y])?;
    Some(Affine2 { m: [row_x, row_y] })
}

/// Least-squares affine fit over the flagged pairs (normal equations).
pub fn fit_least_squares(src: &[Point2], dst: &[Point2], use_pair: &[bool]) -> Option<Affine2> {
    let mut normal = [[0.0f64; 3]; 3];
    let mut rhs_x = [0.0f64; 3];
    let mut rhs_y = [0.0f64; 3];
    let mut used = 0;

    for ((s, d), _) in src.iter().zip(dst).zip(use_pair).filter(|(_, flag)| **flag) {
        let row = [s.x, s.y, 1.0];
        for i in 0..3 {
            for j in 0..3 {
                normal[i][j] += row[i] * row[j];
            }
            rhs_x[i] += row[i] * d.x;
            rhs_y[i] += row[i] * d.y;
        }
        used += 1;
    }

    if used < MINIMAL_SAMPLE {
        return None;
    }

    let row_x = solve3(normal, rhs_x)?;
    let row_y = solve3(normal, rhs_y)?;
    Some(Affine2 { m: [row_x, row_y] })
}

/// Cramer's rule on a 3x3 system.
fn solve3(m: [[f64; 3]; 3], b: [f64; 3]) -> Option<[f64; 3]> {
    let det = det3(&m);
    let scale = m
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    if !det.is_finite() || det.abs() <= 1e-12 * scale.powi(3).max(1.0) {
        return None;
    }

    let mut out = [0.0; 3];
    for (col, value) in out.iter_mut().enumerate() {
        let mut replaced = m;
        for row in 0..3 {
            replaced[row][col] = b[row];
        }
        *value = det3(&replaced) / det;
    }
    Some(out)
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn classify(model: &Affine2, src: &[Point2], dst: &[Point2], threshold_sq: f64) -> Vec<bool> {
    src.iter()
        .zip(dst)
        .map(|(s, d)| model.apply(*s).distance_squared(d) <= threshold_sq)
        .collect()
}

fn count_inliers(model: &Affine2, src: &[Point2], dst: &[Point2], threshold_sq: f64) -> usize {
    src.iter()
        .zip(dst)
        .filter(|(s, d)| model.apply(**s).distance_squared(d) <= threshold_sq)
        .count()
}

/// Iterations needed to draw one all-inlier sample with the requested
/// confidence, capped at the current bound.
fn update_iteration_bound(confidence: f64, outlier_ratio: f64, current: usize) -> usize {
    let confidence = confidence.clamp(0.0, 1.0);
    let outlier_ratio = outlier_ratio.clamp(0.0, 1.0);

    let num = (1.0 - confidence).max(f64::MIN_POSITIVE).ln();
    let denom = 1.0 - (1.0 - outlier_ratio).powi(MINIMAL_SAMPLE as i32);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }
    let denom = denom.ln();
    if denom >= 0.0 || -num >= current as f64 * -denom {
        return current;
    }
    (num / denom).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid_points() -> Vec<Point2> {
        let mut points = Vec::new();
        for y in 0..6 {
            for x in 0..6 {
                points.push(Point2::new(x as f64 * 17.0 + 3.0, y as f64 * 13.0 + 5.0));
            }
        }
        points
    }

    #[test]
    fn test_exact_fit_recovers_transform() {
        let truth = Affine2::similarity(1.3, 12.0, 40.0, -7.0);
        let src = grid_points();
        let dst: Vec<Point2> = src.iter().map(|p| truth.apply(*p)).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let fit = estimate_affine_2d(&src, &dst, &RansacConfig::default(), &mut rng).unwrap();

        assert_eq!(fit.inlier_count, src.len());
        for (row, expected) in fit.transform.m.iter().zip(truth.m.iter()) {
            for (v, e) in row.iter().zip(expected.iter()) {
                assert!((v - e).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_outliers_are_flagged() {
        let truth = Affine2::similarity(0.8, -5.0, 100.0, 50.0);
        let src = grid_points();
        let mut dst: Vec<Point2> = src.iter().map(|p| truth.apply(*p)).collect();
        // Corrupt every fifth pair.
        for (i, p) in dst.iter_mut().enumerate() {
            if i % 5 == 0 {
                p.x += 60.0 + i as f64;
                p.y -= 45.0;
            }
        }
        let mut rng = StdRng::seed_from_u64(7);

        let fit = estimate_affine_2d(&src, &dst, &RansacConfig::default(), &mut rng).unwrap();

        for (i, inlier) in fit.inliers.iter().enumerate() {
            assert_eq!(*inlier, i % 5 != 0, "pair {i}");
        }
        assert!((fit.transform.scale_x() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_too_few_pairs() {
        let src = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        let dst = src.clone();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(estimate_affine_2d(&src, &dst, &RansacConfig::default(), &mut rng).is_none());
    }

    #[test]
    fn test_collinear_input_is_degenerate() {
        let src: Vec<Point2> = (0..10).map(|i| Point2::new(i as f64, 2.0 * i as f64)).collect();
        let dst = src.clone();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(estimate_affine_2d(&src, &dst, &RansacConfig::default(), &mut rng).is_none());
    }

    #[test]
    fn test_min_inliers_enforced() {
        // Three consistent pairs plus unrelated noise: a 3-point model always
        // exists, but it must not be reported.
        let src = vec![
            Point2::new(0.0, 0.0),
            Point2::new(50.0, 0.0),
            Point2::new(0.0, 50.0),
            Point2::new(10.0, 80.0),
            Point2::new(90.0, 10.0),
        ];
        let dst = vec![
            Point2::new(5.0, 5.0),
            Point2::new(55.0, 5.0),
            Point2::new(5.0, 55.0),
            Point2::new(300.0, -40.0),
            Point2::new(-70.0, 210.0),
        ];
        let config = RansacConfig {
            min_inliers: 4,
            ..RansacConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        assert!(estimate_affine_2d(&src, &dst, &config, &mut rng).is_none());
    }

    #[test]
    fn test_iteration_bound_shrinks_with_inliers() {
        assert_eq!(update_iteration_bound(0.95, 0.0, 1000), 0);
        let few = update_iteration_bound(0.95, 0.2, 1000);
        let many = update_iteration_bound(0.95, 0.7, 1000);
        assert!(few < many);
        assert!(many <= 1000);
    }
}
