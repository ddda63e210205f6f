use crate::error::ConfigError;
use crate::pipeline::types::{Correspondence, DescriptorKind, Keypoint};
use crate::utils::geometry::Point2;
use crate::Result;
use opencv::core::{no_array, DMatch, Mat, Vector};
use opencv::features2d::{BFMatcher, FlannBasedMatcher};
use opencv::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Best-to-second-best distance ratio a match must stay below.
pub const DEFAULT_RATIO_THRESHOLD: f32 = 0.7;

/// Descriptor matcher types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatcherId {
    #[serde(rename = "FLANNBASED")]
    FlannBased,
    #[serde(rename = "BRUTEFORCE")]
    BruteForce,
    #[serde(rename = "BRUTEFORCE_L1")]
    BruteForceL1,
    #[serde(rename = "BRUTEFORCE_HAMMING")]
    BruteForceHamming,
    #[serde(rename = "BRUTEFORCE_HAMMINGLUT")]
    BruteForceHammingLut,
    #[serde(rename = "BRUTEFORCE_SL2")]
    BruteForceSl2,
}

impl MatcherId {
    pub const ALL: [MatcherId; 6] = [
        MatcherId::FlannBased,
        MatcherId::BruteForce,
        MatcherId::BruteForceL1,
        MatcherId::BruteForceHamming,
        MatcherId::BruteForceHammingLut,
        MatcherId::BruteForceSl2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatcherId::FlannBased => "FLANNBASED",
            MatcherId::BruteForce => "BRUTEFORCE",
            MatcherId::BruteForceL1 => "BRUTEFORCE_L1",
            MatcherId::BruteForceHamming => "BRUTEFORCE_HAMMING",
            MatcherId::BruteForceHammingLut => "BRUTEFORCE_HAMMINGLUT",
            MatcherId::BruteForceSl2 => "BRUTEFORCE_SL2",
        }
    }

    /// Whether this matcher's metric is defined for `kind` descriptors.
    pub fn accepts(&self, kind: DescriptorKind) -> bool {
        match self {
            MatcherId::BruteForceHamming | MatcherId::BruteForceHammingLut => {
                kind == DescriptorKind::Binary
            }
            MatcherId::FlannBased
            | MatcherId::BruteForce
            | MatcherId::BruteForceL1
            | MatcherId::BruteForceSl2 => kind == DescriptorKind::Float,
        }
    }

    /// Matchers usable with `kind` descriptors, in declaration order.
    pub fn compatible_with(kind: DescriptorKind) -> Vec<MatcherId> {
        MatcherId::ALL
            .iter()
            .copied()
            .filter(|m| m.accepts(kind))
            .collect()
    }

    fn norm_type(&self) -> i32 {
        match self {
            MatcherId::BruteForceL1 => opencv::core::NORM_L1,
            MatcherId::BruteForceHamming | MatcherId::BruteForceHammingLut => {
                opencv::core::NORM_HAMMING
            }
            MatcherId::BruteForceSl2 => opencv::core::NORM_L2SQR,
            MatcherId::BruteForce | MatcherId::FlannBased => opencv::core::NORM_L2,
        }
    }
}

impl fmt::Display for MatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatcherId {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        MatcherId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownMatcher(s.to_string()))
    }
}

/// Distinctiveness test: the best match must beat the runner-up clearly.
/// A zero runner-up distance never passes.
pub fn passes_ratio_test(best: f32, second: f32, ratio: f32) -> bool {
    second > 0.0 && best / second < ratio
}

/// Match every scene descriptor (query) against the template descriptors
/// (train), keeping only distinctive nearest neighbours.
pub fn match_descriptors(
    scene: &Mat,
    template: &Mat,
    matcher: MatcherId,
    ratio: f32,
) -> Result<Vec<Correspondence>> {
    if scene.rows() == 0 || template.rows() == 0 {
        log::info!(
            "descriptor matrix has no rows (scene {}, template {}), nothing to match",
            scene.rows(),
            template.rows()
        );
        return Ok(Vec::new());
    }

    let knn = knn_pairs(scene, template, matcher)?;
    let mut correspondences = Vec::with_capacity(knn.len());
    for candidates in knn.iter() {
        if candidates.len() < 2 {
            continue;
        }
        let best = candidates.get(0)?;
        let runner_up = candidates.get(1)?;
        if passes_ratio_test(best.distance, runner_up.distance, ratio) {
            correspondences.push(Correspondence {
                scene_idx: best.query_idx as usize,
                template_idx: best.train_idx as usize,
                distance: best.distance,
            });
        }
    }

    if correspondences.is_empty() {
        log::info!("no distinctive matches among {} scene descriptors", scene.rows());
    } else {
        log::debug!(
            "{} of {} scene descriptors matched with {}",
            correspondences.len(),
            scene.rows(),
            matcher
        );
    }
    Ok(correspondences)
}

fn knn_pairs(query: &Mat, train: &Mat, matcher: MatcherId) -> Result<Vector<Vector<DMatch>>> {
    let mut knn = Vector::<Vector<DMatch>>::new();
    match matcher {
        MatcherId::FlannBased => {
            let flann = FlannBasedMatcher::create()?;
            flann.knn_train_match(query, train, &mut knn, 2, &no_array(), false)?;
        }
        brute_force => {
            let bf = BFMatcher::create(brute_force.norm_type(), false)?;
            bf.knn_train_match(query, train, &mut knn, 2, &no_array(), false)?;
        }
    }
    Ok(knn)
}

/// Scene and template positions of each correspondence, index-aligned.
#[derive(Debug, Clone, Default)]
pub struct PointPairs {
    pub scene: Vec<Point2>,
    pub template: Vec<Point2>,
}

impl PointPairs {
    pub fn len(&self) -> usize {
        self.scene.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scene.is_empty()
    }

    pub fn push(&mut self, scene: Point2, template: Point2) {
        self.scene.push(scene);
        self.template.push(template);
    }

    /// Drop every pair flagged in `consumed`. Returns how many were dropped.
    pub fn remove_flagged(&mut self, consumed: &[bool]) -> usize {
        let before = self.len();
        let mut flags = consumed.iter();
        self.scene.retain(|_| !flags.next().copied().unwrap_or(false));
        let mut flags = consumed.iter();
        self.template.retain(|_| !flags.next().copied().unwrap_or(false));
        before - self.len()
    }
}

/// Look up keypoint positions for each correspondence, in order.
/// Correspondences pointing past either keypoint list are skipped.
pub fn matched_points(
    correspondences: &[Correspondence],
    scene_keypoints: &[Keypoint],
    template_keypoints: &[Keypoint],
) -> PointPairs {
    let mut pairs = PointPairs::default();
    for c in correspondences {
        let (Some(s), Some(t)) = (
            scene_keypoints.get(c.scene_idx),
            template_keypoints.get(c.template_idx),
        ) else {
            continue;
        };
        pairs.push(
            Point2::new(s.x as f64, s.y as f64),
            Point2::new(t.x as f64, t.y as f64),
        );
    }
    pairs
}
