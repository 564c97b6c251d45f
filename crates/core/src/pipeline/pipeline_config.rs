use std::path::PathBuf;

use crate::capture::infrastructure::source_config::SourceConfig;
use crate::shared::constants::{DEFAULT_CONFIDENCE, DEFAULT_MAX_CONSECUTIVE_FAILURES};
use crate::shared::label_map::LabelMap;

/// Resolved, read-only settings for one pipeline run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Detections below this confidence never reach the renderer.
    pub confidence_threshold: f64,
    pub camera: SourceConfig,
    pub model_weights_path: PathBuf,
    pub label_map: LabelMap,
    pub display_index: usize,
    /// Consecutive `Unavailable` frames tolerated before the run fails.
    pub max_consecutive_failures: u32,
}

impl PipelineConfig {
    pub fn new(camera: SourceConfig, model_weights_path: impl Into<PathBuf>) -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE,
            camera,
            model_weights_path: model_weights_path.into(),
            label_map: LabelMap::default(),
            display_index: 0,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}
