//! JSON settings file and its resolution into per-component configs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::infrastructure::source_config::{
    IndustrialCameraConfig, SourceConfig, UsbCameraConfig,
};
use crate::pipeline::pipeline_config::PipelineConfig;
use crate::pipeline::pipeline_error::{Component, PipelineError};
use crate::rendering::infrastructure::overlay_painter::OverlayStyle;
use crate::rendering::infrastructure::renderer_factory::RendererConfig;
use crate::shared::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CAPTURE_TIMEOUT_MS, DEFAULT_CONFIDENCE,
    DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH, DEFAULT_MAX_CONSECUTIVE_FAILURES,
    DEFAULT_NUM_CLASSES, DEFAULT_STATS_INTERVAL_FRAMES, LOCAL_CONFIG_PATH,
};
use crate::shared::label_map::LabelMap;

/// YOLO input sizes must be a multiple of the network stride.
const MODEL_STRIDE: u32 = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no settings file found (looked in {})", display_paths(.0))]
    NotFound(Vec<PathBuf>),
    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    Usb,
    Industrial,
}

impl std::fmt::Display for CameraType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraType::Usb => write!(f, "usb"),
            CameraType::Industrial => write!(f, "industrial"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub camera_type: CameraType,
    pub model_weights_path: PathBuf,
    #[serde(default = "default_confidence")]
    pub confidence_threshold: f64,
    #[serde(default)]
    pub monitor_index: usize,
    #[serde(default)]
    pub label_map: HashMap<u32, String>,
    #[serde(default)]
    pub camera_index: usize,
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    #[serde(default)]
    pub camera_profile_path: Option<PathBuf>,
    /// Unset means mirrored for industrial cameras only.
    #[serde(default)]
    pub mirror: Option<bool>,
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Unset means read from the model.
    #[serde(default)]
    pub input_size: Option<u32>,
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,
    #[serde(default = "default_true")]
    pub show_confidence: bool,
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_stats_interval_frames")]
    pub stats_interval_frames: usize,
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

fn default_frame_width() -> u32 {
    DEFAULT_FRAME_WIDTH
}

fn default_frame_height() -> u32 {
    DEFAULT_FRAME_HEIGHT
}

fn default_capture_timeout_ms() -> u64 {
    DEFAULT_CAPTURE_TIMEOUT_MS
}

fn default_max_consecutive_failures() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_FAILURES
}

fn default_num_classes() -> usize {
    DEFAULT_NUM_CLASSES
}

fn default_stats_interval_frames() -> usize {
    DEFAULT_STATS_INTERVAL_FRAMES
}

fn default_true() -> bool {
    true
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub confidence_threshold: Option<f64>,
    pub monitor_index: Option<usize>,
    pub camera_index: Option<usize>,
    pub headless: bool,
    pub max_consecutive_failures: Option<u32>,
}

/// Everything the binary needs to assemble a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub pipeline: PipelineConfig,
    pub renderer: RendererConfig,
    pub num_classes: usize,
    pub input_size: Option<u32>,
    pub stats_interval_frames: usize,
}

impl Settings {
    /// Candidate locations, most specific first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
        }
        paths.push(PathBuf::from(LOCAL_CONFIG_PATH));
        paths
    }

    /// `explicit` wins; otherwise the first existing search path.
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        let candidates = Self::search_paths();
        candidates
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or(ConfigError::NotFound(candidates))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn apply(&mut self, overrides: &SettingsOverrides) {
        if let Some(confidence) = overrides.confidence_threshold {
            self.confidence_threshold = confidence;
        }
        if let Some(monitor) = overrides.monitor_index {
            self.monitor_index = monitor;
        }
        if let Some(camera) = overrides.camera_index {
            self.camera_index = camera;
        }
        if overrides.headless {
            self.headless = true;
        }
        if let Some(max) = overrides.max_consecutive_failures {
            self.max_consecutive_failures = max;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| Err(ConfigError::Invalid { field, reason });

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return invalid(
                "confidence_threshold",
                format!("{} is outside [0, 1]", self.confidence_threshold),
            );
        }
        if self.model_weights_path.as_os_str().is_empty() {
            return invalid("model_weights_path", "must not be empty".to_string());
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return invalid(
                "frame_width",
                format!("{}x{} has no pixels", self.frame_width, self.frame_height),
            );
        }
        if self.capture_timeout_ms == 0 {
            return invalid("capture_timeout_ms", "must be greater than 0".to_string());
        }
        if self.max_consecutive_failures == 0 {
            return invalid("max_consecutive_failures", "must be at least 1".to_string());
        }
        if self.num_classes == 0 {
            return invalid("num_classes", "must be at least 1".to_string());
        }
        if self.stats_interval_frames == 0 {
            return invalid("stats_interval_frames", "must be at least 1".to_string());
        }
        if let Some(size) = self.input_size {
            if size == 0 || size % MODEL_STRIDE != 0 {
                return invalid(
                    "input_size",
                    format!("{size} is not a positive multiple of {MODEL_STRIDE}"),
                );
            }
        }
        if self.camera_type == CameraType::Industrial && self.camera_profile_path.is_none() {
            return invalid(
                "camera_profile_path",
                "required for industrial cameras".to_string(),
            );
        }
        Ok(())
    }

    /// Validates and splits the settings into per-component configs.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        self.validate()?;

        let timeout = Duration::from_millis(self.capture_timeout_ms);
        let camera = match self.camera_type {
            CameraType::Usb => SourceConfig::Usb(UsbCameraConfig {
                device_index: self.camera_index,
                width: self.frame_width,
                height: self.frame_height,
                timeout,
                mirror: self.mirror.unwrap_or(false),
            }),
            CameraType::Industrial => SourceConfig::Industrial(IndustrialCameraConfig {
                device_index: self.camera_index,
                profile_path: self.camera_profile_path.clone().unwrap_or_default(),
                timeout,
                mirror: self.mirror.unwrap_or(true),
            }),
        };

        let pipeline = PipelineConfig {
            confidence_threshold: self.confidence_threshold,
            camera,
            model_weights_path: self.model_weights_path.clone(),
            label_map: LabelMap::new(self.label_map.clone()),
            display_index: self.monitor_index,
            max_consecutive_failures: self.max_consecutive_failures,
        };
        let renderer = RendererConfig {
            headless: self.headless,
            style: OverlayStyle {
                show_confidence: self.show_confidence,
                ..OverlayStyle::default()
            },
            ..RendererConfig::default()
        };

        Ok(ResolvedConfig {
            pipeline,
            renderer,
            num_classes: self.num_classes,
            input_size: self.input_size,
            stats_interval_frames: self.stats_interval_frames,
        })
    }

    /// Locates, loads, overrides and resolves in one go. Failures name the
    /// configuration step that broke.
    pub fn resolve_from(
        explicit: Option<&Path>,
        overrides: &SettingsOverrides,
    ) -> Result<ResolvedConfig, PipelineError> {
        let failed = |operation: &'static str, e: ConfigError| {
            PipelineError::fatal_init(Component::Configuration, operation, e)
        };
        let path = Self::locate(explicit).map_err(|e| failed("locate", e))?;
        let mut settings = Self::load(&path).map_err(|e| failed("load", e))?;
        settings.apply(overrides);
        settings.resolve().map_err(|e| failed("resolve", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn write_settings(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    fn minimal() -> Settings {
        serde_json::from_str(r#"{"camera_type": "usb", "model_weights_path": "yolo.onnx"}"#)
            .unwrap()
    }

    #[test]
    fn test_minimal_file_gets_defaults() {
        let file = write_settings(
            r#"{"camera_type": "usb", "model_weights_path": "weights/yolov8n-face.onnx"}"#,
        );
        let settings = Settings::load(file.path()).unwrap();

        assert_eq!(settings.camera_type, CameraType::Usb);
        assert_eq!(settings.confidence_threshold, DEFAULT_CONFIDENCE);
        assert_eq!(settings.monitor_index, 0);
        assert_eq!(settings.max_consecutive_failures, 10);
        assert_eq!(settings.capture_timeout_ms, 5000);
        assert_eq!((settings.frame_width, settings.frame_height), (640, 480));
        assert!(settings.show_confidence);
        assert!(!settings.headless);
        assert!(settings.label_map.is_empty());
    }

    #[test]
    fn test_label_map_keys_are_class_ids() {
        let file = write_settings(
            r#"{
                "camera_type": "industrial",
                "model_weights_path": "yolo.onnx",
                "camera_profile_path": "resources/camera.pfs",
                "label_map": {"0": "face", "1": "mask"}
            }"#,
        );
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.label_map.get(&1).map(String::as_str), Some("mask"));
    }

    #[rstest]
    #[case(r#"{"model_weights_path": "yolo.onnx"}"#)]
    #[case(r#"{"camera_type": "firewire", "model_weights_path": "yolo.onnx"}"#)]
    #[case(r#"{"camera_type": "usb", "model_weights_path": "yolo.onnx", "confidence_threshold": "high"}"#)]
    #[case("{not json")]
    fn test_malformed_file_is_parse_error(#[case] json: &str) {
        let file = write_settings(json);
        assert!(matches!(
            Settings::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Settings::load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = Settings::locate(Some(Path::new("custom.json"))).unwrap();
        assert_eq!(path, PathBuf::from("custom.json"));
    }

    #[test]
    fn test_search_paths_end_with_local_file() {
        let paths = Settings::search_paths();
        assert_eq!(paths.last(), Some(&PathBuf::from(LOCAL_CONFIG_PATH)));
    }

    #[rstest]
    #[case::confidence_too_high(|s: &mut Settings| s.confidence_threshold = 1.5, "confidence_threshold")]
    #[case::confidence_nan(|s: &mut Settings| s.confidence_threshold = f64::NAN, "confidence_threshold")]
    #[case::zero_failures(|s: &mut Settings| s.max_consecutive_failures = 0, "max_consecutive_failures")]
    #[case::zero_timeout(|s: &mut Settings| s.capture_timeout_ms = 0, "capture_timeout_ms")]
    #[case::odd_input_size(|s: &mut Settings| s.input_size = Some(500), "input_size")]
    #[case::no_classes(|s: &mut Settings| s.num_classes = 0, "num_classes")]
    #[case::industrial_without_profile(|s: &mut Settings| s.camera_type = CameraType::Industrial, "camera_profile_path")]
    fn test_validate_rejects(#[case] mutate: fn(&mut Settings), #[case] field: &str) {
        let mut settings = minimal();
        mutate(&mut settings);
        match settings.validate() {
            Err(ConfigError::Invalid { field: f, .. }) => assert_eq!(f, field),
            other => panic!("expected invalid {field}, got {other:?}"),
        }
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut settings = minimal();
        settings.apply(&SettingsOverrides {
            confidence_threshold: Some(0.7),
            monitor_index: Some(2),
            camera_index: Some(1),
            headless: true,
            max_consecutive_failures: Some(3),
        });
        assert_eq!(settings.confidence_threshold, 0.7);
        assert_eq!(settings.monitor_index, 2);
        assert_eq!(settings.camera_index, 1);
        assert!(settings.headless);
        assert_eq!(settings.max_consecutive_failures, 3);
    }

    #[test]
    fn test_empty_overrides_change_nothing() {
        let mut settings = minimal();
        settings.apply(&SettingsOverrides::default());
        assert_eq!(settings, minimal());
    }

    #[test]
    fn test_resolve_usb() {
        let mut settings = minimal();
        settings.camera_index = 2;
        settings.label_map.insert(0, "face".to_string());
        let resolved = settings.resolve().unwrap();

        match &resolved.pipeline.camera {
            SourceConfig::Usb(usb) => {
                assert_eq!(usb.device_index, 2);
                assert_eq!(usb.timeout, Duration::from_millis(5000));
                assert!(!usb.mirror);
            }
            other => panic!("expected USB camera, got {other:?}"),
        }
        assert_eq!(resolved.pipeline.label_map.translate(0), "face");
        assert_eq!(resolved.pipeline.max_consecutive_failures, 10);
        assert!(!resolved.renderer.headless);
    }

    #[test]
    fn test_resolve_industrial_mirrors_by_default() {
        let mut settings = minimal();
        settings.camera_type = CameraType::Industrial;
        settings.camera_profile_path = Some(PathBuf::from("resources/camera.pfs"));
        let resolved = settings.resolve().unwrap();

        match resolved.pipeline.camera {
            SourceConfig::Industrial(cfg) => {
                assert!(cfg.mirror);
                assert_eq!(cfg.profile_path, PathBuf::from("resources/camera.pfs"));
            }
            other => panic!("expected industrial camera, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_carries_overlay_preference() {
        let mut settings = minimal();
        settings.show_confidence = false;
        let resolved = settings.resolve().unwrap();
        assert!(!resolved.renderer.style.show_confidence);
    }

    #[test]
    fn test_resolve_from_applies_overrides() {
        let file = write_settings(r#"{"camera_type": "usb", "model_weights_path": "yolo.onnx"}"#);
        let overrides = SettingsOverrides {
            headless: true,
            ..SettingsOverrides::default()
        };
        let resolved = Settings::resolve_from(Some(file.path()), &overrides).unwrap();
        assert!(resolved.renderer.headless);
    }

    #[rstest]
    #[case::malformed("{not json", "load")]
    #[case::invalid(r#"{"camera_type": "usb", "model_weights_path": "yolo.onnx", "confidence_threshold": 1.5}"#, "resolve")]
    fn test_resolve_from_failure_names_configuration(#[case] json: &str, #[case] operation: &str) {
        let file = write_settings(json);
        let err = Settings::resolve_from(Some(file.path()), &SettingsOverrides::default())
            .unwrap_err();
        assert_eq!(err.component(), Component::Configuration);
        assert_eq!(err.operation(), operation);
        assert!(err.to_string().starts_with("configuration"));
    }
}
