//! The real-time capture → detect → display loop.
//!
//! One iteration is in flight at a time. Cancellation (Ctrl+C or the
//! display's quit key) is observed only at the top of the loop, so a frame
//! that has been captured is always either presented or accounted as a
//! failure.

use std::time::Instant;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::detection::domain::detection_model::DetectionModel;
use crate::rendering::domain::frame_renderer::FrameRenderer;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

use super::pipeline_config::PipelineConfig;
use super::pipeline_error::{Component, PipelineError};
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::pipeline_state::PipelineState;
use super::stop_signal::StopSignal;

/// Outcome of one run.
#[derive(Debug)]
pub struct PipelineReport {
    pub state: PipelineState,
    pub frames_captured: u64,
    pub frames_presented: u64,
    pub capture_failures: u64,
    pub inference_failures: u64,
    pub presentation_failures: u64,
    /// Detections discarded because their box left the frame.
    pub detections_dropped: u64,
    /// Set when `state` is `Failed`.
    pub error: Option<PipelineError>,
}

impl PipelineReport {
    fn new() -> Self {
        Self {
            state: PipelineState::Starting,
            frames_captured: 0,
            frames_presented: 0,
            capture_failures: 0,
            inference_failures: 0,
            presentation_failures: 0,
            detections_dropped: 0,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Stopped
    }
}

/// Which resources have been acquired and not yet released.
#[derive(Default)]
struct Held {
    model: bool,
    source: bool,
    renderer: bool,
}

/// How the running loop ended.
enum LoopExit {
    Stop,
    EndOfStream,
    Fatal(PipelineError),
}

pub struct PipelineController {
    config: PipelineConfig,
    source: Box<dyn FrameSource>,
    model: Box<dyn DetectionModel>,
    renderer: Box<dyn FrameRenderer>,
    logger: Box<dyn PipelineLogger>,
    stop: StopSignal,
    state: PipelineState,
    consecutive_failures: u32,
    presenting: bool,
    held: Held,
    report: PipelineReport,
}

impl PipelineController {
    pub fn new(
        config: PipelineConfig,
        source: Box<dyn FrameSource>,
        model: Box<dyn DetectionModel>,
        renderer: Box<dyn FrameRenderer>,
        stop: StopSignal,
    ) -> Self {
        Self {
            config,
            source,
            model,
            renderer,
            logger: Box::new(NullPipelineLogger),
            stop,
            state: PipelineState::Starting,
            consecutive_failures: 0,
            presenting: true,
            held: Held::default(),
            report: PipelineReport::new(),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Runs the pipeline to a terminal state and reports how it went.
    ///
    /// Every acquired resource has been released exactly once on return.
    pub fn run(mut self) -> PipelineReport {
        let exit = match self.start() {
            Ok(()) => {
                self.transition(PipelineState::Running);
                self.run_loop()
            }
            Err(e) => LoopExit::Fatal(e),
        };

        match exit {
            LoopExit::Fatal(error) => {
                log::error!("{error}");
                self.transition(PipelineState::Failed);
                if let Err(release_error) = self.release() {
                    log::error!("{release_error}");
                }
                self.report.error = Some(error);
            }
            LoopExit::Stop | LoopExit::EndOfStream => {
                self.transition(PipelineState::Draining);
                match self.release() {
                    Ok(()) => self.transition(PipelineState::Stopped),
                    Err(error) => {
                        log::error!("{error}");
                        self.transition(PipelineState::Failed);
                        self.report.error = Some(error);
                    }
                }
            }
        }

        self.logger.summary();
        self.report.state = self.state;
        std::mem::replace(&mut self.report, PipelineReport::new())
    }

    fn transition(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "{} -> {next}",
            self.state
        );
        log::info!("Pipeline {} -> {next}", self.state);
        self.state = next;
    }

    /// Model first so a bad weights file never touches the hardware.
    fn start(&mut self) -> Result<(), PipelineError> {
        log::info!(
            "Starting: {} / {} / {}",
            self.source.describe(),
            self.model.describe(),
            self.renderer.describe()
        );

        self.model
            .load(&self.config.model_weights_path)
            .map_err(|e| PipelineError::fatal_init(Component::Model, "load", e))?;
        self.held.model = true;

        self.source
            .open()
            .map_err(|e| PipelineError::fatal_init(Component::Camera, "open", e))?;
        self.held.source = true;

        self.renderer
            .open()
            .map_err(|e| PipelineError::fatal_init(Component::Renderer, "open", e))?;
        self.held.renderer = true;
        Ok(())
    }

    fn run_loop(&mut self) -> LoopExit {
        loop {
            if self.stop.is_stop_requested() {
                log::info!("Stop requested");
                return LoopExit::Stop;
            }
            if self.renderer.stop_requested() {
                log::info!("Display closed by operator");
                return LoopExit::Stop;
            }

            let started = Instant::now();
            let frame = match self.source.next_frame() {
                Ok(frame) => frame,
                Err(CaptureError::EndOfStream) => {
                    log::info!("{}: end of stream", self.source.describe());
                    return LoopExit::EndOfStream;
                }
                Err(e) if e.is_recoverable() => {
                    self.report.capture_failures += 1;
                    self.consecutive_failures += 1;
                    log::warn!(
                        "{}: {e} ({}/{} consecutive)",
                        self.source.describe(),
                        self.consecutive_failures,
                        self.config.max_consecutive_failures
                    );
                    if self.consecutive_failures >= self.config.max_consecutive_failures {
                        return LoopExit::Fatal(PipelineError::fatal_runtime(
                            Component::Camera,
                            "next_frame",
                            self.state,
                            e,
                        ));
                    }
                    continue;
                }
                Err(e) => {
                    return LoopExit::Fatal(PipelineError::fatal_runtime(
                        Component::Camera,
                        "next_frame",
                        self.state,
                        e,
                    ))
                }
            };
            if self.consecutive_failures > 0 {
                log::info!(
                    "Capture recovered after {} failure(s)",
                    self.consecutive_failures
                );
            }
            self.consecutive_failures = 0;
            self.report.frames_captured += 1;
            self.logger.timing("capture", elapsed_ms(started));

            if let Err(error) = self.process(frame) {
                return LoopExit::Fatal(error);
            }
        }
    }

    /// Infer, filter, label, draw and present one frame.
    fn process(&mut self, frame: Frame) -> Result<(), PipelineError> {
        let sequence = frame.sequence();

        let started = Instant::now();
        let raw = match self.model.infer(&frame, self.config.confidence_threshold) {
            Ok(detections) => detections,
            Err(e) if e.is_recoverable() => {
                self.report.inference_failures += 1;
                log::warn!("frame {sequence} skipped: {e}");
                return Ok(());
            }
            Err(e) => {
                return Err(PipelineError::fatal_runtime(
                    Component::Model,
                    "infer",
                    self.state,
                    e,
                ))
            }
        };
        self.logger.timing("inference", elapsed_ms(started));

        let detections = self.accept(&frame, raw);
        self.logger.metric("detections", detections.len() as f64);

        let started = Instant::now();
        let frame = self.renderer.draw_detections(frame, &detections);
        self.logger.timing("render", elapsed_ms(started));

        let started = Instant::now();
        match self.renderer.present(&frame, self.config.display_index) {
            Ok(()) => {
                if !self.presenting {
                    log::info!("Presentation resumed at frame {sequence}");
                    self.presenting = true;
                }
                self.report.frames_presented += 1;
                self.logger.timing("present", elapsed_ms(started));
            }
            Err(e) if e.is_recoverable() => {
                self.report.presentation_failures += 1;
                if self.presenting {
                    log::warn!("{}: {e}", self.renderer.describe());
                    self.presenting = false;
                } else {
                    log::debug!("frame {sequence} not presented: {e}");
                }
            }
            Err(e) => {
                return Err(PipelineError::fatal_runtime(
                    Component::Renderer,
                    "present",
                    self.state,
                    e,
                ))
            }
        }

        self.logger.frame_completed(sequence);
        Ok(())
    }

    /// Applies the threshold and frame-bounds checks, then the label map.
    fn accept(&mut self, frame: &Frame, raw: Vec<Detection>) -> Vec<Detection> {
        let threshold = self.config.confidence_threshold;
        let mut accepted = Vec::with_capacity(raw.len());
        for detection in raw {
            if !(detection.confidence() >= threshold) {
                continue;
            }
            if !detection.bbox().fits_within(frame.width(), frame.height()) {
                self.report.detections_dropped += 1;
                log::warn!(
                    "frame {}: dropping {:?} outside {}x{}",
                    frame.sequence(),
                    detection.bbox(),
                    frame.width(),
                    frame.height()
                );
                continue;
            }
            accepted.push(self.config.label_map.apply(&detection));
        }
        accepted
    }

    /// Closes the camera, then the display, then unloads the model; each at
    /// most once. Only a camera close failure is reported.
    fn release(&mut self) -> Result<(), PipelineError> {
        let mut result = Ok(());

        if std::mem::take(&mut self.held.source) {
            if let Err(e) = self.source.close() {
                result = Err(PipelineError::fatal_runtime(
                    Component::Camera,
                    "close",
                    self.state,
                    e,
                ));
            }
        }
        if std::mem::take(&mut self.held.renderer) {
            if let Err(e) = self.renderer.close() {
                log::warn!("{}: {e}", self.renderer.describe());
            }
        }
        if std::mem::take(&mut self.held.model) {
            self.model.unload();
        }
        result
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::error!("{e}");
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
