use crate::error::ConfigError;
use crate::pipeline::traits::FeatureBackend;
use crate::pipeline::types::DescriptorKind;
use crate::Result;
use opencv::core::{KeyPoint, Mat, Vector};
use opencv::features2d::{
    AKAZE_DescriptorType, KAZE_DiffusivityType, ORB_ScoreType, AKAZE, BRISK, ORB, SIFT,
};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Named locator/descriptor combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocatorId {
    #[serde(rename = "AKAZE_DESCRIPTOR_KAZE_UPRIGHT")]
    AkazeKazeUpright,
    #[serde(rename = "AKAZE_DESCRIPTOR_MLDB")]
    AkazeMldb,
    #[serde(rename = "ORB")]
    Orb,
    #[serde(rename = "ORB_BRISK")]
    OrbBrisk,
    #[serde(rename = "BRISK")]
    Brisk,
    #[serde(rename = "SIFT")]
    Sift,
    #[serde(rename = "SIFT_BRISK")]
    SiftBrisk,
}

impl LocatorId {
    pub const ALL: [LocatorId; 7] = [
        LocatorId::AkazeKazeUpright,
        LocatorId::AkazeMldb,
        LocatorId::Orb,
        LocatorId::OrbBrisk,
        LocatorId::Brisk,
        LocatorId::Sift,
        LocatorId::SiftBrisk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorId::AkazeKazeUpright => "AKAZE_DESCRIPTOR_KAZE_UPRIGHT",
            LocatorId::AkazeMldb => "AKAZE_DESCRIPTOR_MLDB",
            LocatorId::Orb => "ORB",
            LocatorId::OrbBrisk => "ORB_BRISK",
            LocatorId::Brisk => "BRISK",
            LocatorId::Sift => "SIFT",
            LocatorId::SiftBrisk => "SIFT_BRISK",
        }
    }

    /// Element type of the rows the descriptor half produces.
    pub fn descriptor_kind(&self) -> DescriptorKind {
        match self {
            LocatorId::Sift | LocatorId::AkazeKazeUpright => DescriptorKind::Float,
            LocatorId::AkazeMldb
            | LocatorId::Orb
            | LocatorId::OrbBrisk
            | LocatorId::Brisk
            | LocatorId::SiftBrisk => DescriptorKind::Binary,
        }
    }
}

impl fmt::Display for LocatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocatorId {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        LocatorId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownLocator(s.to_string()))
    }
}

/// A locator and, when it differs, the descriptor run on its keypoints.
///
/// An empty pair has neither: extraction through it yields no keypoints.
pub struct BackendPair {
    locator: Option<Box<dyn FeatureBackend>>,
    descriptor: Option<Box<dyn FeatureBackend>>,
}

impl fmt::Debug for BackendPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendPair")
            .field("locator", &self.locator.is_some())
            .field("descriptor", &self.descriptor.is_some())
            .finish()
    }
}

impl BackendPair {
    pub fn empty() -> Self {
        Self {
            locator: None,
            descriptor: None,
        }
    }

    /// One algorithm both locating and describing.
    pub fn single<L: FeatureBackend + 'static>(locator: L) -> Self {
        Self {
            locator: Some(Box::new(locator)),
            descriptor: None,
        }
    }

    pub fn paired<L, D>(locator: L, descriptor: D) -> Self
    where
        L: FeatureBackend + 'static,
        D: FeatureBackend + 'static,
    {
        Self {
            locator: Some(Box::new(locator)),
            descriptor: Some(Box::new(descriptor)),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.locator.is_some()
    }

    pub fn has_separate_descriptor(&self) -> bool {
        self.descriptor.is_some()
    }

    pub fn locate(&mut self, image: &Mat) -> Result<Vector<KeyPoint>> {
        match self.locator.as_mut() {
            Some(locator) => locator.locate(image),
            None => Ok(Vector::new()),
        }
    }

    /// Describe with the descriptor half, or with the locator when the pair
    /// has no separate descriptor.
    pub fn describe(&mut self, image: &Mat, keypoints: &mut Vector<KeyPoint>) -> Result<Mat> {
        match (self.descriptor.as_mut(), self.locator.as_mut()) {
            (Some(descriptor), _) => descriptor.describe(image, keypoints),
            (None, Some(locator)) => locator.describe(image, keypoints),
            (None, None) => {
                keypoints.clear();
                Ok(Mat::default())
            }
        }
    }
}

/// Lazily built, cached feature backends keyed by [`LocatorId`].
///
/// Construction happens at most once per id. A backend that fails to build
/// is reported and left uncached, so a later request retries it.
pub struct FeatureRegistry {
    backends: HashMap<LocatorId, BackendPair>,
    empty: BackendPair,
    constructions: usize,
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cached: Vec<&str> = self.backends.keys().map(|id| id.as_str()).collect();
        cached.sort_unstable();
        f.debug_struct("FeatureRegistry")
            .field("cached", &cached)
            .field("constructions", &self.constructions)
            .finish()
    }
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            empty: BackendPair::empty(),
            constructions: 0,
        }
    }

    /// Backend pair for `id`, built on first use.
    pub fn get(&mut self, id: LocatorId) -> &mut BackendPair {
        match self.backends.entry(id) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => match build_backend(id) {
                Ok(pair) => {
                    log::debug!("constructed feature backend {}", id);
                    self.constructions += 1;
                    slot.insert(pair)
                }
                Err(err) => {
                    log::warn!("failed to construct feature backend {}: {}", id, err);
                    self.empty = BackendPair::empty();
                    &mut self.empty
                }
            },
        }
    }

    /// Lookup by textual name. Unknown names are reported and answered with
    /// an empty pair that is never cached.
    pub fn get_named(&mut self, name: &str) -> &mut BackendPair {
        match name.parse::<LocatorId>() {
            Ok(id) => self.get(id),
            Err(err) => {
                log::warn!("{}", err);
                self.empty = BackendPair::empty();
                &mut self.empty
            }
        }
    }

    /// Build every listed backend ahead of use. Returns how many are usable.
    pub fn warm(&mut self, ids: &[LocatorId]) -> usize {
        ids.iter().filter(|id| self.get(**id).is_usable()).count()
    }

    pub fn is_cached(&self, id: LocatorId) -> bool {
        self.backends.contains_key(&id)
    }

    /// Number of successful backend constructions so far.
    pub fn construction_count(&self) -> usize {
        self.constructions
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

fn build_backend(id: LocatorId) -> Result<BackendPair> {
    let pair = match id {
        LocatorId::AkazeKazeUpright => {
            BackendPair::single(create_akaze(AKAZE_DescriptorType::DESCRIPTOR_KAZE_UPRIGHT)?)
        }
        LocatorId::AkazeMldb => {
            BackendPair::single(create_akaze(AKAZE_DescriptorType::DESCRIPTOR_MLDB)?)
        }
        LocatorId::Orb => BackendPair::single(create_orb()?),
        LocatorId::OrbBrisk => BackendPair::paired(create_orb()?, create_brisk()?),
        LocatorId::Brisk => BackendPair::single(create_brisk()?),
        LocatorId::Sift => BackendPair::single(create_sift()?),
        LocatorId::SiftBrisk => BackendPair::paired(create_sift()?, create_brisk()?),
    };
    Ok(pair)
}

fn create_orb() -> Result<opencv::core::Ptr<ORB>> {
    Ok(ORB::create(
        100_000,
        1.1,
        16,
        8,
        0,
        2,
        ORB_ScoreType::HARRIS_SCORE,
        24,
        20,
    )?)
}

fn create_akaze(descriptor: AKAZE_DescriptorType) -> Result<opencv::core::Ptr<AKAZE>> {
    Ok(AKAZE::create(
        descriptor,
        0,
        3,
        0.001f32,
        4,
        4,
        KAZE_DiffusivityType::DIFF_PM_G2,
        -1,
    )?)
}

fn create_sift() -> Result<opencv::core::Ptr<SIFT>> {
    Ok(SIFT::create(0, 3, 0.04, 10.0, 1.6, false)?)
}

fn create_brisk() -> Result<opencv::core::Ptr<BRISK>> {
    Ok(BRISK::create(60, 6, 1.0)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in LocatorId::ALL {
            assert_eq!(id.as_str().parse::<LocatorId>().unwrap(), id);
        }
        assert!(matches!(
            "SURF".parse::<LocatorId>(),
            Err(ConfigError::UnknownLocator(name)) if name == "SURF"
        ));
    }

    #[test]
    fn test_descriptor_kinds() {
        assert_eq!(LocatorId::Orb.descriptor_kind(), DescriptorKind::Binary);
        assert_eq!(LocatorId::SiftBrisk.descriptor_kind(), DescriptorKind::Binary);
        assert_eq!(LocatorId::Sift.descriptor_kind(), DescriptorKind::Float);
        assert_eq!(LocatorId::AkazeKazeUpright.descriptor_kind(), DescriptorKind::Float);
    }

    #[test]
    fn test_backend_built_once() {
        let mut registry = FeatureRegistry::new();
        assert!(registry.get(LocatorId::Orb).is_usable());
        assert!(registry.get(LocatorId::Orb).is_usable());
        assert_eq!(registry.construction_count(), 1);
        assert!(registry.is_cached(LocatorId::Orb));
    }

    #[test]
    fn test_paired_backend_has_descriptor() {
        let mut registry = FeatureRegistry::new();
        let pair = registry.get(LocatorId::OrbBrisk);
        assert!(pair.is_usable());
        assert!(pair.has_separate_descriptor());
    }

    #[test]
    fn test_unknown_name_yields_uncached_empty_pair() {
        let mut registry = FeatureRegistry::new();
        let pair = registry.get_named("NOT_A_DETECTOR");
        assert!(!pair.is_usable());
        assert!(registry.is_empty());
        assert_eq!(registry.construction_count(), 0);
    }

    #[test]
    fn test_warm_builds_all() {
        let mut registry = FeatureRegistry::new();
        let usable = registry.warm(&[LocatorId::Orb, LocatorId::Brisk]);
        assert_eq!(usable, 2);
        assert_eq!(registry.len(), 2);
        registry.get(LocatorId::Brisk);
        assert_eq!(registry.construction_count(), 2);
    }
}
