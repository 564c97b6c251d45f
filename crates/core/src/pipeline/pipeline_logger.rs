use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for pipeline loop events.
///
/// Decouples the controller from specific output mechanisms so the CLI can
/// print throughput while tests stay silent.
pub trait PipelineLogger {
    /// Report that one more frame went through the whole loop.
    fn frame_completed(&mut self, sequence: u64);

    /// Record how long a named pipeline stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. detections per frame).
    fn metric(&mut self, name: &str, value: f64);

    /// Emit an end-of-pipeline summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_completed(&mut self, _sequence: u64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
}

/// Running aggregate of one stream of samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Aggregate {
    count: u64,
    total: f64,
    max: f64,
}

impl Aggregate {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        self.max = self.max.max(value);
    }

    fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Logger for live runs: aggregates per-stage timing and metrics, reports
/// frame rate every `interval_frames` frames and a summary at shutdown.
///
/// Memory stays constant however long the loop runs.
pub struct StdoutPipelineLogger {
    interval_frames: usize,
    timings: HashMap<String, Aggregate>,
    metrics: HashMap<String, Aggregate>,
    start_time: Instant,
    window_start: Instant,
    window_frames: usize,
    total_frames: usize,
    last_fps: Option<f64>,
}

impl StdoutPipelineLogger {
    pub fn new(interval_frames: usize) -> Self {
        let now = Instant::now();
        Self {
            interval_frames: interval_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: now,
            window_start: now,
            window_frames: 0,
            total_frames: 0,
            last_fps: None,
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.total_frames;
        let mut lines = Vec::new();

        lines.push(format!(
            "Pipeline summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, agg) in stages {
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms  total {:7.0}ms",
                agg.average(),
                agg.max,
                agg.total
            ));
        }

        let mut metrics: Vec<_> = self.metrics.iter().collect();
        metrics.sort_by(|a, b| a.0.cmp(b.0));
        for (name, agg) in metrics {
            lines.push(format!("  {name}: avg {:.1}", agg.average()));
        }

        if let Some(fps) = self.last_fps {
            lines.push(format!("  Last FPS: {fps:.1}"));
        }
        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame_completed(&mut self, sequence: u64) {
        self.total_frames += 1;
        self.window_frames += 1;
        if self.window_frames < self.interval_frames {
            return;
        }

        let secs = self.window_start.elapsed().as_secs_f64();
        if secs > 0.0 {
            let fps = self.window_frames as f64 / secs;
            self.last_fps = Some(fps);
            log::info!("FPS: {fps:.1} (frame {sequence})");
        }
        self.window_frames = 0;
        self.window_start = Instant::now();
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        record(&mut self.timings, stage, duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        record(&mut self.metrics, name, value);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

/// Keys are allocated once per stream, not once per sample.
fn record(aggregates: &mut HashMap<String, Aggregate>, key: &str, value: f64) {
    match aggregates.get_mut(key) {
        Some(agg) => agg.record(value),
        None => {
            let mut agg = Aggregate::default();
            agg.record(value);
            aggregates.insert(key.to_string(), agg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.frame_completed(1);
        logger.timing("inference", 5.0);
        logger.metric("detections", 3.0);
        logger.summary();
    }

    #[test]
    fn test_timing_aggregates_per_stage() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("inference", 20.0);
        logger.timing("inference", 30.0);
        logger.timing("capture", 5.0);

        let inference = logger.timings["inference"];
        assert_eq!(inference.count, 2);
        assert_relative_eq!(inference.total, 50.0);
        assert_relative_eq!(inference.max, 30.0);
        assert_eq!(logger.timings["capture"].count, 1);
        assert!(!logger.timings.contains_key("present"));
    }

    #[test]
    fn test_long_run_keeps_constant_state() {
        let mut logger = StdoutPipelineLogger::new(30);
        for sequence in 1..=100_000u64 {
            for stage in ["capture", "inference", "render", "present"] {
                logger.timing(stage, 1.0);
            }
            logger.metric("detections", 1.0);
            logger.frame_completed(sequence);
        }

        assert_eq!(logger.timings.len(), 4);
        assert_eq!(logger.metrics.len(), 1);
        assert_eq!(logger.timings["present"].count, 100_000);
        assert_eq!(logger.total_frames, 100_000);
    }

    #[test]
    fn test_metric_average_in_summary() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.total_frames = 5;
        logger.metric("detections", 3.0);
        logger.metric("detections", 4.0);

        assert_relative_eq!(logger.metrics["detections"].average(), 3.5);
        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("detections: avg 3.5"));
    }

    #[test]
    fn test_summary_lists_stages() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("inference", 20.0);
        logger.timing("present", 5.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Pipeline summary"));
        assert!(summary.contains("inference"));
        assert!(summary.contains("present"));
    }

    #[test]
    fn test_summary_includes_fps() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.total_frames = 100;
        logger.timing("inference", 10.0);
        assert!(logger.summary_string().unwrap().contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_fps_reported_once_per_interval() {
        let mut logger = StdoutPipelineLogger::new(3);
        logger.window_start = Instant::now() - std::time::Duration::from_secs(1);
        logger.frame_completed(1);
        logger.frame_completed(2);
        assert!(logger.last_fps.is_none());

        logger.frame_completed(3);
        let fps = logger.last_fps.unwrap();
        assert!(fps > 0.0 && fps <= 3.0);
        assert_eq!(logger.window_frames, 0);
        assert_eq!(logger.total_frames, 3);
    }

    #[test]
    fn test_interval_is_at_least_one() {
        assert_eq!(StdoutPipelineLogger::new(0).interval_frames, 1);
        assert_eq!(StdoutPipelineLogger::default().interval_frames, 30);
    }
}
