use crate::algorithms::localizer::{Localizer, LocalizerConfig};
use crate::algorithms::matcher::{MatcherId, DEFAULT_RATIO_THRESHOLD};
use crate::algorithms::registry::LocatorId;
use crate::algorithms::validation::ValidationLimits;
use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::pipeline::engine::AlgorithmSelection;
use crate::pipeline::preprocess::ChannelSelector;
use crate::utils::ransac::RansacConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything needed to build a [`crate::pipeline::LocalizationEngine`].
///
/// Identifiers are kept as the strings found in the file so that a typo is
/// reported as a typed [`ConfigError`] rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub locator: String,
    pub matcher: String,
    pub channel: String,
    pub ratio_threshold: f32,
    pub localizer: LocalizerConfig,
    pub validation: ValidationLimits,
    pub ransac: RansacConfig,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locator: LocatorId::Orb.as_str().to_string(),
            matcher: MatcherId::BruteForceHamming.as_str().to_string(),
            channel: ChannelSelector::Grayscale.as_str().to_string(),
            ratio_threshold: DEFAULT_RATIO_THRESHOLD,
            localizer: LocalizerConfig::default(),
            validation: ValidationLimits::default(),
            ransac: RansacConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;

        if content.trim_start().starts_with('{') {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> Result<(), ConfigError> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the identifiers into a checked algorithm selection.
    pub fn selection(&self) -> Result<AlgorithmSelection, ConfigError> {
        let locator: LocatorId = self.locator.parse()?;
        let matcher: MatcherId = self.matcher.parse()?;
        let kind = locator.descriptor_kind();
        if !matcher.accepts(kind) {
            return Err(ConfigError::IncompatibleMatcher {
                locator: locator.to_string(),
                matcher: matcher.to_string(),
                kind,
            });
        }
        Ok(AlgorithmSelection::new(
            locator,
            matcher,
            ChannelSelector::parse(&self.channel),
        ))
    }

    pub fn localizer(&self) -> Localizer {
        Localizer::new(
            self.localizer.clone(),
            self.validation.clone(),
            self.ransac.clone(),
        )
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.selection() {
            errors.push(e.to_string());
        }

        if !(self.ratio_threshold > 0.0 && self.ratio_threshold <= 1.0) {
            errors.push("ratio_threshold must be within (0, 1]".to_string());
        }

        if let Err(mut e) = self.localizer.validate() {
            errors.append(&mut e);
        }
        if let Err(mut e) = self.validation.validate() {
            errors.append(&mut e);
        }

        if self.ransac.max_iterations == 0 {
            errors.push("ransac.max_iterations must be positive".to_string());
        }
        if !(self.ransac.reprojection_threshold > 0.0) {
            errors.push("ransac.reprojection_threshold must be positive".to_string());
        }
        if !(self.ransac.confidence > 0.0 && self.ransac.confidence < 1.0) {
            errors.push("ransac.confidence must be within (0, 1)".to_string());
        }

        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ConfigFormat {
    Json,
    Toml,
}

pub fn load_config_or_default(config_path: Option<&Path>) -> EngineConfig {
    let Some(path) = config_path else {
        return EngineConfig::default();
    };

    match EngineConfig::load_from_file(path) {
        Ok(config) => {
            if let Err(errors) = config.validate() {
                log::warn!("configuration {} is invalid:", path.display());
                for error in errors {
                    log::warn!("  - {}", error);
                }
                log::warn!("using default configuration instead");
                EngineConfig::default()
            } else {
                config
            }
        }
        Err(e) => {
            log::warn!("failed to load config from '{}': {}", path.display(), e);
            log::warn!("using default configuration");
            EngineConfig::default()
        }
    }
}
