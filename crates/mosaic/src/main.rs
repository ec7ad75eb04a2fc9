use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use mosaic::cli::Cli;
use mosaic::io::{load_raster, save_raster};
use mosaic::window::WinitEventPump;
use mosaic::{DisplaySurface, PresentationConfig, PresentationLoop, ProcessingRuntime, RunConfig};
use raster::partition;
use region_scheduler::{CancellationFlag, RegionScheduler, RunOutcome};
use renderer::GpuPresenter;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    let config = Cli::parse().into_config()?;
    run(config)
}

fn run(config: RunConfig) -> anyhow::Result<()> {
    let raster = Arc::new(load_raster(&config.input)?);
    tracing::info!(
        path = %config.input.display(),
        width = raster.width(),
        height = raster.height(),
        channels = raster.channels(),
        "image loaded"
    );
    let scheduler = RegionScheduler::new(config.scheduler)?;
    let regions = partition(raster.width(), raster.height(), config.kernel_size)?;

    let (mut events, window) =
        WinitEventPump::open(&config.window).context("display unavailable")?;
    let surface = DisplaySurface::new();
    surface.set_image(Arc::clone(&raster))?;
    surface.set_background_color(config.background);
    surface.set_refresh_interval(config.refresh_interval);
    surface.init(|| GpuPresenter::new(Arc::clone(&window)))?;

    let cancel = CancellationFlag::new();
    let (progress_sender, progress_receiver) = crossbeam_channel::unbounded();
    let (completion_sender, completion_receiver) = crossbeam_channel::bounded(1);
    let processing = ProcessingRuntime::start(
        scheduler.with_events(progress_sender),
        Arc::clone(&raster),
        regions,
        cancel.clone(),
        completion_sender,
    )?;

    let mut presentation = PresentationLoop::new(PresentationConfig {
        close_when_done: config.close_when_done,
        ..PresentationConfig::default()
    })
    .with_progress(progress_receiver)
    .with_completion(completion_receiver);
    let loop_result = presentation.run(&surface, &mut events, &cancel);

    // The loop has set the flag; workers finish their current region and stop.
    let processing_result = processing.join();
    surface.shutdown();
    let exit = loop_result?;
    let report = processing_result?;
    tracing::info!(
        reason = ?exit.reason,
        frames = exit.frames_presented,
        "viewer closed"
    );
    if report.outcome == RunOutcome::Cancelled {
        tracing::info!(
            completed = report.completed,
            total = report.total,
            "processing ended early"
        );
    }

    if let Some(output) = &config.output {
        save_raster(output, &raster)?;
    }
    Ok(())
}
