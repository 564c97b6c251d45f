use std::path::PathBuf;
use std::process;

use clap::Parser;

use facewatch_core::capture::infrastructure::frame_source_factory::create_frame_source;
use facewatch_core::config::settings::{ResolvedConfig, Settings, SettingsOverrides};
use facewatch_core::detection::infrastructure::onnx_yolo_model::OnnxYoloModel;
use facewatch_core::pipeline::pipeline_controller::PipelineController;
use facewatch_core::pipeline::pipeline_error::{Component, PipelineError};
use facewatch_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facewatch_core::pipeline::stop_signal::StopSignal;
use facewatch_core::rendering::infrastructure::monitor::discover_monitors;
use facewatch_core::rendering::infrastructure::renderer_factory::create_renderer;

/// Live face detection from a USB or industrial camera.
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
    /// Settings file (default: user config dir, then resources/config.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Monitor to display on.
    #[arg(long)]
    monitor: Option<usize>,

    /// Camera device index.
    #[arg(long)]
    camera: Option<usize>,

    /// Run without a display window.
    #[arg(long)]
    headless: bool,

    /// Consecutive capture failures tolerated before giving up.
    #[arg(long)]
    max_failures: Option<u32>,

    /// Print the connected monitors and exit.
    #[arg(long)]
    list_monitors: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    if cli.list_monitors {
        for m in discover_monitors()? {
            println!(
                "{}: {} {}x{} at ({}, {}){}",
                m.index,
                m.name,
                m.width,
                m.height,
                m.x,
                m.y,
                if m.is_primary { " [primary]" } else { "" }
            );
        }
        return Ok(());
    }

    let resolved = Settings::resolve_from(cli.config.as_deref(), &overrides(&cli))?;

    run_pipeline(resolved)?;
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(confidence) = cli.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(format!("Confidence must be between 0.0 and 1.0, got {confidence}").into());
        }
    }
    if cli.max_failures == Some(0) {
        return Err("--max-failures must be at least 1".into());
    }
    Ok(())
}

fn overrides(cli: &Cli) -> SettingsOverrides {
    SettingsOverrides {
        confidence_threshold: cli.confidence,
        monitor_index: cli.monitor,
        camera_index: cli.camera,
        headless: cli.headless,
        max_consecutive_failures: cli.max_failures,
    }
}

fn run_pipeline(resolved: ResolvedConfig) -> Result<(), PipelineError> {
    let stop = StopSignal::new();
    stop.install_ctrlc_handler();

    let source = create_frame_source(&resolved.pipeline.camera)
        .map_err(|e| PipelineError::fatal_init(Component::Camera, "create", e))?;
    let model = Box::new(OnnxYoloModel::new(
        resolved.num_classes,
        resolved.input_size,
    ));
    let renderer = create_renderer(&resolved.renderer);
    let logger = Box::new(StdoutPipelineLogger::new(resolved.stats_interval_frames));

    log::info!("Press q or Esc in the window, or Ctrl+C, to stop");
    let mut report = PipelineController::new(resolved.pipeline, source, model, renderer, stop)
        .with_logger(logger)
        .run();

    log::info!(
        "Finished {}: {} captured, {} presented, {} capture / {} inference / {} presentation failure(s)",
        report.state,
        report.frames_captured,
        report.frames_presented,
        report.capture_failures,
        report.inference_failures,
        report.presentation_failures
    );
    match report.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
