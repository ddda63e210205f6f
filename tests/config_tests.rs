use std::fs;
use tempfile::TempDir;
use template_locator::config::{load_config_or_default, ConfigFormat};
use template_locator::pipeline::ChannelSelector;
use template_locator::{ConfigError, EngineConfig, LocalizationEngine, LocatorId, MatcherId};

fn tuned_config() -> EngineConfig {
    let mut config = EngineConfig {
        locator: "AKAZE_DESCRIPTOR_MLDB".to_string(),
        matcher: "BRUTEFORCE_HAMMINGLUT".to_string(),
        channel: "S".to_string(),
        ratio_threshold: 0.65,
        ..EngineConfig::default()
    };
    config.localizer.max_rounds = 6;
    config.validation.max_rotation_degrees = 30.0;
    config.ransac.seed = 7;
    config
}

#[test]
fn test_toml_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    let config = tuned_config();

    config.save_to_file(&path, ConfigFormat::Toml).unwrap();
    let loaded = EngineConfig::load_from_file(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_json_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.json");
    let config = tuned_config();

    config.save_to_file(&path, ConfigFormat::Json).unwrap();
    let loaded = EngineConfig::load_from_file(&path).unwrap();

    assert_eq!(loaded, config);
    let selection = loaded.selection().unwrap();
    assert_eq!(selection.locator, LocatorId::AkazeMldb);
    assert_eq!(selection.matcher, MatcherId::BruteForceHammingLut);
    assert_eq!(selection.channel, ChannelSelector::Saturation);
}

#[test]
fn test_unknown_identifiers_are_typed_errors() {
    let config = EngineConfig {
        locator: "SURF".to_string(),
        ..EngineConfig::default()
    };
    assert!(matches!(config.selection(), Err(ConfigError::UnknownLocator(name)) if name == "SURF"));

    let config = EngineConfig {
        matcher: "NEAREST".to_string(),
        ..EngineConfig::default()
    };
    assert!(matches!(config.selection(), Err(ConfigError::UnknownMatcher(_))));
}

#[test]
fn test_engine_refuses_incompatible_matcher() {
    let config = EngineConfig {
        locator: "SIFT".to_string(),
        matcher: "BRUTEFORCE_HAMMING".to_string(),
        ..EngineConfig::default()
    };
    let error = LocalizationEngine::from_config(&config).unwrap_err();
    assert!(error.to_string().contains("BRUTEFORCE_HAMMING"), "{}", error);
}

#[test]
fn test_unrecognized_channel_passes_through() {
    let config = EngineConfig {
        channel: "LUMA".to_string(),
        ..EngineConfig::default()
    };
    assert!(config.validate().is_ok());
    assert_eq!(
        config.selection().unwrap().channel,
        ChannelSelector::PassThrough("LUMA".to_string())
    );
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config_or_default(Some(&dir.path().join("absent.toml")));
    assert_eq!(config, EngineConfig::default());
    assert_eq!(load_config_or_default(None), EngineConfig::default());
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    fs::write(&path, "locator = \"SURF\"\nratio_threshold = 0.6\n").unwrap();

    assert_eq!(load_config_or_default(Some(&path)), EngineConfig::default());

    fs::write(&path, "ratio_threshold = [").unwrap();
    assert!(matches!(
        EngineConfig::load_from_file(&path),
        Err(ConfigError::Toml(_))
    ));
}
