use std::io::Write;

use tempfile::{Builder, NamedTempFile};

use ppe_detect::config::{AppConfig, ConfigOverrides, DisplayBackend};

fn write_config(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_json_config_with_overrides() {
    let file = write_config(
        ".json",
        r#"{
            "model": {
                "path": "/opt/models/ppe.onnx",
                "input_width": 320,
                "input_height": 320,
                "warm_up": false
            },
            "camera": {
                "index": 1,
                "target_fps": 15,
                "width": 1280,
                "height": 720
            },
            "file": { "target_fps": 25 },
            "display": {
                "window_name": "Site A",
                "backend": "window"
            }
        }"#,
    );

    let overrides = ConfigOverrides {
        model_path: None,
        display: Some(DisplayBackend::Headless),
    };
    let cfg = AppConfig::load(Some(file.path()), &overrides).expect("load config");

    assert_eq!(cfg.model.path, "/opt/models/ppe.onnx");
    assert_eq!((cfg.model.input_width, cfg.model.input_height), (320, 320));
    assert!(!cfg.model.warm_up);
    assert_eq!(cfg.file.target_fps, 25);
    assert_eq!(cfg.display.window_name, "Site A");
    assert_eq!(cfg.display.backend, DisplayBackend::Headless);

    let camera = cfg.camera.camera_config(None);
    assert_eq!(camera.device, "/dev/video1");
    assert_eq!((camera.width, camera.height, camera.target_fps), (1280, 720, 15));
}

#[test]
fn loads_toml_config_by_extension() {
    let file = write_config(
        ".toml",
        r#"
            [model]
            path = "stub://ppe"

            [camera]
            device = "stub://bench-cam"

            [display]
            backend = "headless"
        "#,
    );

    let cfg = AppConfig::load(Some(file.path()), &ConfigOverrides::default()).expect("load config");

    assert_eq!(cfg.model.path, "stub://ppe");
    assert_eq!(cfg.model.input_width, 640);
    assert_eq!(cfg.camera.camera_config(None).device, "stub://bench-cam");
    assert_eq!(cfg.display.window_name, "Object Detection");
    assert_eq!(cfg.display.backend, DisplayBackend::Headless);
}

#[test]
fn rejects_invalid_values() {
    let bad_input = write_config(".json", r#"{ "model": { "input_width": 600 } }"#);
    assert!(AppConfig::load(Some(bad_input.path()), &ConfigOverrides::default()).is_err());

    let bad_backend = write_config(".json", r#"{ "display": { "backend": "terminal" } }"#);
    assert!(AppConfig::load(Some(bad_backend.path()), &ConfigOverrides::default()).is_err());

    let empty_window = write_config(".json", r#"{ "display": { "window_name": " " } }"#);
    assert!(AppConfig::load(Some(empty_window.path()), &ConfigOverrides::default()).is_err());
}

#[test]
fn missing_config_file_is_an_error() {
    let path = std::path::Path::new("/nonexistent/ppe_detect.json");
    let err = AppConfig::load(Some(path), &ConfigOverrides::default()).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}
