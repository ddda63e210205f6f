use crate::pipeline::types::DescriptorKind;
use thiserror::Error;

/// Problems with an engine configuration, caught before any scan runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown locator identifier: {0}")]
    UnknownLocator(String),

    #[error("unknown matcher identifier: {0}")]
    UnknownMatcher(String),

    #[error("matcher {matcher} cannot compare the {kind} descriptors produced by {locator}")]
    IncompatibleMatcher {
        locator: String,
        matcher: String,
        kind: DescriptorKind,
    },

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to write TOML configuration: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("failed to parse JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}
