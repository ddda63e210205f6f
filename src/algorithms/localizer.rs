use crate::algorithms::matcher::PointPairs;
use crate::algorithms::validation::{validate_transform, Rejection, ValidationLimits};
use crate::pipeline::merge::add_or_merge;
use crate::pipeline::types::DetectionRegion;
use crate::utils::geometry::{Affine2, ImageSize, Point2};
use crate::utils::ransac::{estimate_affine_2d, RansacConfig};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Budgets of the iterative localizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// Consecutive rejected rounds tolerated before giving up.
    pub max_rejections: u32,
    /// Total rounds per template and scene.
    pub max_rounds: u32,
    /// Stop once fewer correspondences than this remain.
    pub min_correspondences: usize,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            max_rejections: 8,
            max_rounds: 12,
            min_correspondences: 5,
        }
    }
}

impl LocalizerConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.max_rejections == 0 {
            errors.push("localizer.max_rejections must be at least 1".to_string());
        }
        if self.max_rounds == 0 {
            errors.push("localizer.max_rounds must be at least 1".to_string());
        }
        if self.min_correspondences < 3 {
            errors.push("localizer.min_correspondences must be at least 3".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// What happened in one localizer round.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// Correspondences in the pool when the round started.
    pub available: usize,
    pub transform: Option<Affine2>,
    /// Correspondences consumed by the round.
    pub inlier_count: usize,
    /// The emitted region (before merging), or the reason none was emitted.
    pub verdict: Result<DetectionRegion, Rejection>,
}

impl RoundOutcome {
    pub fn is_accepted(&self) -> bool {
        self.verdict.is_ok()
    }
}

/// Repeatedly fits an affine transform to the remaining correspondences,
/// turning every plausible fit into a region.
#[derive(Debug, Clone, Default)]
pub struct Localizer {
    pub config: LocalizerConfig,
    pub limits: ValidationLimits,
    pub ransac: RansacConfig,
}

impl Localizer {
    pub fn new(config: LocalizerConfig, limits: ValidationLimits, ransac: RansacConfig) -> Self {
        Self {
            config,
            limits,
            ransac,
        }
    }

    pub fn localize<R: Rng + ?Sized>(
        &self,
        pairs: PointPairs,
        template_size: ImageSize,
        scene_size: ImageSize,
        template_keypoints: usize,
        rng: &mut R,
    ) -> Vec<DetectionRegion> {
        self.run(pairs, template_size, scene_size, template_keypoints, rng, None)
    }

    /// Like [`Localizer::localize`], also returning every round's outcome.
    pub fn localize_traced<R: Rng + ?Sized>(
        &self,
        pairs: PointPairs,
        template_size: ImageSize,
        scene_size: ImageSize,
        template_keypoints: usize,
        rng: &mut R,
    ) -> (Vec<DetectionRegion>, Vec<RoundOutcome>) {
        let mut rounds = Vec::new();
        let regions = self.run(
            pairs,
            template_size,
            scene_size,
            template_keypoints,
            rng,
            Some(&mut rounds),
        );
        (regions, rounds)
    }

    fn run<R: Rng + ?Sized>(
        &self,
        mut pairs: PointPairs,
        template_size: ImageSize,
        scene_size: ImageSize,
        template_keypoints: usize,
        rng: &mut R,
        mut trace: Option<&mut Vec<RoundOutcome>>,
    ) -> Vec<DetectionRegion> {
        let mut regions = Vec::new();
        let mut rejections_left = self.config.max_rejections;
        let mut rounds_left = self.config.max_rounds;

        loop {
            let available = pairs.len();
            if available < self.config.min_correspondences {
                log::trace!("{} correspondences left, stopping", available);
                break;
            }

            let outcome = match estimate_affine_2d(&pairs.template, &pairs.scene, &self.ransac, rng) {
                None => RoundOutcome {
                    available,
                    transform: None,
                    inlier_count: 0,
                    verdict: Err(Rejection::NoConsensus),
                },
                Some(fit) => {
                    let consumed = pairs.remove_flagged(&fit.inliers);
                    let verdict =
                        validate_transform(&fit.transform, template_size, scene_size, &self.limits)
                            .map(|()| {
                                let confidence = consumed as f32 / template_keypoints.max(1) as f32;
                                project_region(template_size, &fit.transform, confidence)
                            });
                    RoundOutcome {
                        available,
                        transform: Some(fit.transform),
                        inlier_count: consumed,
                        verdict,
                    }
                }
            };

            match &outcome.verdict {
                Ok(region) => {
                    log::debug!(
                        "accepted region {}x{} at ({}, {}) from {} inliers",
                        region.width,
                        region.height,
                        region.x,
                        region.y,
                        outcome.inlier_count
                    );
                    add_or_merge(&mut regions, *region);
                    rejections_left = self.config.max_rejections;
                }
                Err(rejection) => {
                    log::debug!(
                        "rejected round ({} inliers consumed): {}",
                        outcome.inlier_count,
                        rejection
                    );
                    rejections_left = rejections_left.saturating_sub(1);
                }
            }
            if let Some(rounds) = trace.as_deref_mut() {
                rounds.push(outcome);
            }

            if rejections_left == 0 {
                log::trace!("rejection budget exhausted");
                break;
            }
            rounds_left = rounds_left.saturating_sub(1);
            if rounds_left == 0 {
                log::trace!("round budget exhausted");
                break;
            }
        }

        regions
    }
}

/// Axis-aligned rectangle of the template projected by `transform`, taken
/// from the midpoints of opposite edges of the projected quadrilateral.
pub fn project_region(template: ImageSize, transform: &Affine2, confidence: f32) -> DetectionRegion {
    let w = template.width as f64;
    let h = template.height as f64;
    let corners = [
        transform.apply(Point2::new(0.0, 0.0)),
        transform.apply(Point2::new(w, 0.0)),
        transform.apply(Point2::new(w, h)),
        transform.apply(Point2::new(0.0, h)),
    ];

    let left = ((corners[0].x + corners[3].x) / 2.0).round();
    let top = ((corners[0].y + corners[1].y) / 2.0).round();
    let right = ((corners[1].x + corners[2].x) / 2.0).round();
    let bottom = ((corners[2].y + corners[3].y) / 2.0).round();

    DetectionRegion::new(
        left as i32,
        top as i32,
        (right - left) as i32,
        (bottom - top) as i32,
        confidence,
    )
}
