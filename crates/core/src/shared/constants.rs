/// Default detection confidence threshold.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// How many capture failures in a row are tolerated before the camera is
/// declared dead.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Upper bound on a single blocking frame request (milliseconds).
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 5000;

pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;

/// Faces only.
pub const DEFAULT_NUM_CLASSES: usize = 1;

/// Throughput is logged every this many frames.
pub const DEFAULT_STATS_INTERVAL_FRAMES: usize = 30;

/// Application directory name under the platform config dir.
pub const APP_DIR_NAME: &str = "FaceWatch";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Fallback config location, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = "resources/config.json";

/// Assumed monitor geometry when none can be discovered.
pub const FALLBACK_MONITOR_SIZE: (u32, u32) = (1920, 1080);
