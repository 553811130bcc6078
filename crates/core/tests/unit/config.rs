//! Configuration deserialization, defaults, and validation.

use aim_core::config::Config;
use aim_core::AimError;

#[test]
fn defaults_match_spec() {
    let cfg = Config::from_json(
        r#"{"system": {"num_channels": 1}, "device": {"model": "GDDR6_AiM"}, "controller": {}}"#,
    )
    .unwrap();
    assert_eq!(cfg.controller.high_watermark, 0.8);
    assert_eq!(cfg.controller.low_watermark, 0.2);
    assert_eq!(cfg.system.num_channels, 1);
}

#[test]
fn yaml_and_json_agree() {
    let json = Config::from_json(
        r#"{"system": {"num_channels": 1}, "device": {"model": "LPDDR5_AiM"}, "controller": {}}"#,
    )
    .unwrap();
    let yaml = Config::from_yaml(
        "system:\n  num_channels: 1\ndevice:\n  model: LPDDR5_AiM\ncontroller: {}\n",
    )
    .unwrap();
    assert_eq!(json.device.model, yaml.device.model);
    assert_eq!(json.controller.high_watermark, yaml.controller.high_watermark);
}

#[test]
fn unknown_device_model_is_configuration_error() {
    let cfg = Config::from_json(
        r#"{"system": {"num_channels": 1}, "device": {"model": "NOT_A_REAL_MODEL"}, "controller": {}}"#,
    )
    .unwrap();
    let err = aim_core::MemorySystem::new(&cfg).unwrap_err();
    assert!(matches!(err, AimError::Configuration(_)));
}

#[test]
fn channel_count_mismatch_is_configuration_error() {
    // LPDDR5_AiM's organization preset declares a single channel.
    let cfg = Config::from_json(
        r#"{"system": {"num_channels": 2}, "device": {"model": "LPDDR5_AiM"}, "controller": {}}"#,
    )
    .unwrap();
    let err = aim_core::MemorySystem::new(&cfg).unwrap_err();
    assert!(matches!(err, AimError::Configuration(_)));
}

#[test]
fn malformed_json_is_configuration_error() {
    let err = Config::from_json("{ not json").unwrap_err();
    assert!(matches!(err, AimError::Configuration(_)));
}

#[test]
fn unknown_timing_override_is_rejected() {
    let cfg = Config::from_json(
        r#"{
            "system": {"num_channels": 1},
            "device": {"model": "LPDDR5_AiM", "timing_overrides_cycles": {"nNotARealParam": 5}},
            "controller": {}
        }"#,
    )
    .unwrap();
    let err = aim_core::MemorySystem::new(&cfg).unwrap_err();
    assert!(matches!(err, AimError::Configuration(_)));
}

#[test]
fn density_mismatch_is_rejected() {
    let cfg = Config::from_json(
        r#"{
            "system": {"num_channels": 1},
            "device": {"model": "LPDDR5_AiM", "density_gb": 999.0},
            "controller": {}
        }"#,
    )
    .unwrap();
    let err = aim_core::MemorySystem::new(&cfg).unwrap_err();
    assert!(matches!(err, AimError::Configuration(_)));
}
