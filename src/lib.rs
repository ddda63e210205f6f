pub mod algorithms;
pub mod analysis;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod utils;

pub use algorithms::{FeatureRegistry, Localizer, LocatorId, MatcherId};
pub use config::EngineConfig;
pub use error::ConfigError;
pub use pipeline::{
    AlgorithmSelection, ChannelSelector, DetectionRegion, LocalizationEngine, ScanStats,
    TemplateScan,
};

pub type Result<T> = anyhow::Result<T>;
