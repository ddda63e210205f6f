use crate::algorithms::features::FeatureSet;
use crate::algorithms::localizer::Localizer;
use crate::algorithms::matcher::{match_descriptors, matched_points, MatcherId, DEFAULT_RATIO_THRESHOLD};
use crate::algorithms::registry::{FeatureRegistry, LocatorId};
use crate::config::EngineConfig;
use crate::correlation_span;
use crate::error::ConfigError;
use crate::logging;
use crate::pipeline::preprocess::{self, ChannelSelector};
use crate::pipeline::types::DetectionRegion;
use crate::utils::geometry::ImageSize;
use crate::Result;
use instant::Instant;
use opencv::core::Mat;
use opencv::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Locator, matcher and channel used by an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmSelection {
    pub locator: LocatorId,
    pub matcher: MatcherId,
    pub channel: ChannelSelector,
}

impl Default for AlgorithmSelection {
    fn default() -> Self {
        Self {
            locator: LocatorId::Orb,
            matcher: MatcherId::BruteForceHamming,
            channel: ChannelSelector::Grayscale,
        }
    }
}

impl AlgorithmSelection {
    pub fn new(locator: LocatorId, matcher: MatcherId, channel: ChannelSelector) -> Self {
        Self {
            locator,
            matcher,
            channel,
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.matcher.accepts(self.locator.descriptor_kind())
    }
}

/// Per-template record of the last scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateScan {
    /// Masked out; no matching was attempted.
    Skipped,
    Searched { correspondences: usize, regions: usize },
    /// A backend error was absorbed; the template reported no regions.
    Failed(String),
}

/// Instrumentation for one [`LocalizationEngine::localize_all`] call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    pub scan_id: Option<Uuid>,
    pub scene_keypoints: usize,
    pub templates: Vec<TemplateScan>,
    pub elapsed_ms: f64,
}

impl ScanStats {
    pub fn searched_count(&self) -> usize {
        self.templates
            .iter()
            .filter(|t| matches!(t, TemplateScan::Searched { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.templates
            .iter()
            .filter(|t| matches!(t, TemplateScan::Skipped))
            .count()
    }
}

/// Template catalog plus the algorithm configuration used to search scenes
/// for every registered template.
pub struct LocalizationEngine {
    selection: AlgorithmSelection,
    ratio_threshold: f32,
    localizer: Localizer,
    registry: FeatureRegistry,
    templates: Vec<FeatureSet>,
    last_scan: ScanStats,
}

impl LocalizationEngine {
    pub fn new(selection: AlgorithmSelection) -> Self {
        Self::with_registry(selection, FeatureRegistry::new())
    }

    /// Build an engine on top of an existing registry, reusing any backends
    /// it already holds.
    pub fn with_registry(selection: AlgorithmSelection, registry: FeatureRegistry) -> Self {
        if !selection.is_compatible() {
            log::warn!(
                "matcher {} does not fit {} descriptors of {}; scans will find nothing",
                selection.matcher,
                selection.locator.descriptor_kind(),
                selection.locator
            );
        }
        Self {
            selection,
            ratio_threshold: DEFAULT_RATIO_THRESHOLD,
            localizer: Localizer::default(),
            registry,
            templates: Vec::new(),
            last_scan: ScanStats::default(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> std::result::Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::Invalid)?;
        let selection = config.selection()?;
        Ok(Self::new(selection)
            .with_localizer(config.localizer())
            .with_ratio_threshold(config.ratio_threshold))
    }

    pub fn with_localizer(mut self, localizer: Localizer) -> Self {
        self.localizer = localizer;
        self
    }

    pub fn with_ratio_threshold(mut self, ratio_threshold: f32) -> Self {
        self.ratio_threshold = ratio_threshold;
        self
    }

    pub fn selection(&self) -> &AlgorithmSelection {
        &self.selection
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    /// Give up the engine, keeping its constructed backends for a successor.
    pub fn into_registry(self) -> FeatureRegistry {
        self.registry
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    pub fn template(&self, index: usize) -> Option<&FeatureSet> {
        self.templates.get(index)
    }

    pub fn last_scan(&self) -> &ScanStats {
        &self.last_scan
    }

    /// Extract and store the features of a template. Returns its index.
    ///
    /// A template whose extraction fails is still registered, with no
    /// features, so indices stay aligned with the caller's list.
    pub fn register_template(&mut self, image: &Mat) -> usize {
        let features = match self.features_of(image) {
            Ok(features) => features,
            Err(err) => {
                log::warn!("template feature extraction failed: {}", err);
                FeatureSet::empty(image_size(image))
            }
        };
        log::debug!(
            "registered template {} with {} keypoints",
            self.templates.len(),
            features.len()
        );
        self.templates.push(features);
        self.templates.len() - 1
    }

    /// Search `scene` for every active template.
    ///
    /// Returns one list per registered template in registration order.
    /// `mask[i] == false` skips template `i`; indices past the end of the
    /// mask are searched.
    pub fn localize_all(&mut self, scene: &Mat, mask: Option<&[bool]>) -> Vec<Vec<DetectionRegion>> {
        let scan_id = logging::new_correlation_id();
        let span = correlation_span!(
            tracing::Level::INFO,
            "localize_all",
            templates = self.templates.len()
        );
        let _enter = span.enter();
        let start = Instant::now();

        let mut stats = ScanStats {
            scan_id: Some(scan_id),
            ..ScanStats::default()
        };
        let mut results = vec![Vec::new(); self.templates.len()];

        let scene_features = self.features_of(scene);
        if let Ok(features) = &scene_features {
            stats.scene_keypoints = features.len();
        }

        for (index, template) in self.templates.iter().enumerate() {
            let active = mask.and_then(|m| m.get(index)).copied().unwrap_or(true);
            if !active {
                stats.templates.push(TemplateScan::Skipped);
                continue;
            }

            let searched = match &scene_features {
                Ok(features) => search_template(
                    features,
                    template,
                    self.selection.matcher,
                    self.ratio_threshold,
                    &self.localizer,
                    index,
                ),
                Err(err) => Err(anyhow::anyhow!("scene feature extraction failed: {}", err)),
            };

            match searched {
                Ok((correspondences, regions)) => {
                    stats.templates.push(TemplateScan::Searched {
                        correspondences,
                        regions: regions.len(),
                    });
                    results[index] = regions;
                }
                Err(err) => {
                    log::warn!("template {} search failed: {}", index, err);
                    stats.templates.push(TemplateScan::Failed(err.to_string()));
                }
            }
        }

        stats.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            scene_keypoints = stats.scene_keypoints,
            searched = stats.searched_count(),
            skipped = stats.skipped_count(),
            elapsed_ms = stats.elapsed_ms,
            "scan complete"
        );
        self.last_scan = stats;
        logging::clear_correlation_id();
        results
    }

    /// Run the whole pipeline for one template that is not registered.
    pub fn locate_once(&mut self, scene: &Mat, template: &Mat) -> Vec<DetectionRegion> {
        match self.try_locate_once(scene, template) {
            Ok(regions) => regions,
            Err(err) => {
                log::warn!("one-shot search failed: {}", err);
                Vec::new()
            }
        }
    }

    fn try_locate_once(&mut self, scene: &Mat, template: &Mat) -> Result<Vec<DetectionRegion>> {
        let template_features = self.features_of(template)?;
        let scene_features = self.features_of(scene)?;
        let (_, regions) = search_template(
            &scene_features,
            &template_features,
            self.selection.matcher,
            self.ratio_threshold,
            &self.localizer,
            0,
        )?;
        Ok(regions)
    }

    fn features_of(&mut self, image: &Mat) -> Result<FeatureSet> {
        let backend = self.registry.get(self.selection.locator);
        if image.channels() > 1 {
            let reduced = preprocess::reduce(image, &self.selection.channel)?;
            FeatureSet::from_image(&reduced, backend)
        } else {
            FeatureSet::from_image(image, backend)
        }
    }
}

/// Match one template against the scene and localize its instances.
///
/// Sampling is seeded from the RANSAC seed and the template index alone, so
/// a template's result does not depend on earlier scans or on which other
/// templates were searched.
fn search_template(
    scene: &FeatureSet,
    template: &FeatureSet,
    matcher: MatcherId,
    ratio_threshold: f32,
    localizer: &Localizer,
    index: usize,
) -> Result<(usize, Vec<DetectionRegion>)> {
    let mut rng = StdRng::seed_from_u64(localizer.ransac.seed ^ index as u64);
    let correspondences = match_descriptors(
        scene.descriptors(),
        template.descriptors(),
        matcher,
        ratio_threshold,
    )?;
    let pairs = matched_points(&correspondences, scene.keypoints(), template.keypoints());
    let regions = localizer.localize(pairs, template.size(), scene.size(), template.len(), &mut rng);
    Ok((correspondences.len(), regions))
}

fn image_size(image: &Mat) -> ImageSize {
    ImageSize::new(image.cols(), image.rows())
}
