//! Cancellable scheduler that runs the block-mean transform over a set of regions.
//!
//! Regions handed to [`RegionScheduler::run`] must be pairwise disjoint (a
//! `raster::Partition` is). Workers then write their regions without any lock
//! between them, while other threads may keep reading the raster.

mod cancellation;

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use crossbeam_queue::SegQueue;
use raster::{Pixel, RasterError, Region, RegionView, SharedRaster, apply_mean};

pub use cancellation::CancellationFlag;

/// Upper bound for the default pool size, leaving cores for the presentation thread.
pub const DEFAULT_MAX_WORKERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    Sequential,
    Concurrent,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown execution mode `{0}`, expected `sequential` or `concurrent`")]
pub struct ParseExecutionModeError(String);

impl FromStr for ExecutionMode {
    type Err = ParseExecutionModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(ExecutionMode::Sequential),
            "concurrent" | "parallel" => Ok(ExecutionMode::Concurrent),
            _ => Err(ParseExecutionModeError(value.to_owned())),
        }
    }
}

pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(DEFAULT_MAX_WORKERS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub mode: ExecutionMode,
    /// Pool size in concurrent mode; ignored in sequential mode.
    pub worker_count: usize,
    /// Simulated per-region cost, slept before each region starts.
    pub region_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Concurrent,
            worker_count: default_worker_count(),
            region_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerConfigError {
    #[error("worker count must be greater than zero")]
    ZeroWorkers,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid region: {0}")]
    Region(#[from] RasterError),
}

/// Progress notification sent to the optional event sink.
///
/// `Completed` is sent after the region's pixels are written, so a receiver
/// that reads the raster after receiving it observes the new color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionEvent {
    Started {
        worker: usize,
        region: Region,
    },
    Completed {
        worker: usize,
        region: Region,
        color: Pixel,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Cancellation was observed before every region ran. Not an error.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub mode: ExecutionMode,
    pub workers: usize,
    pub total: usize,
    pub started: usize,
    pub completed: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    pub fn remaining(&self) -> usize {
        self.total - self.completed
    }
}

#[derive(Debug, Default)]
struct Progress {
    started: AtomicUsize,
    completed: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct RegionScheduler {
    config: SchedulerConfig,
    events: Option<Sender<RegionEvent>>,
}

impl RegionScheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerConfigError> {
        if config.worker_count == 0 {
            return Err(SchedulerConfigError::ZeroWorkers);
        }
        Ok(Self {
            config,
            events: None,
        })
    }

    pub fn with_events(mut self, events: Sender<RegionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Applies the block-mean transform to every region unless `cancel` is set first.
    ///
    /// All regions are bounds-checked before any pixel is touched. The flag is
    /// polled before each region and again after the throttle delay; a region
    /// that has started always runs to completion, and this returns only once
    /// every started region has finished.
    pub fn run<I>(
        &self,
        raster: &SharedRaster,
        regions: I,
        cancel: &CancellationFlag,
    ) -> Result<RunReport, ScheduleError>
    where
        I: IntoIterator<Item = Region>,
    {
        let views = regions
            .into_iter()
            .map(|region| raster.view(region))
            .collect::<Result<Vec<_>, _>>()?;
        let total = views.len();
        let workers = match self.config.mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Concurrent => self.config.worker_count.min(total).max(1),
        };
        tracing::info!(
            mode = %self.config.mode,
            workers,
            regions = total,
            "region processing started"
        );

        let started_at = Instant::now();
        let progress = Progress::default();
        match self.config.mode {
            ExecutionMode::Sequential => {
                let mut pending = views.into_iter();
                self.work_loop(0, cancel, &progress, || pending.next());
            }
            ExecutionMode::Concurrent => self.run_concurrent(views, workers, cancel, &progress),
        }

        let completed = progress.completed.into_inner();
        let report = RunReport {
            outcome: if completed == total {
                RunOutcome::Completed
            } else {
                RunOutcome::Cancelled
            },
            mode: self.config.mode,
            workers,
            total,
            started: progress.started.into_inner(),
            completed,
            elapsed: started_at.elapsed(),
        };
        tracing::info!(
            outcome = ?report.outcome,
            completed = report.completed,
            total = report.total,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "region processing finished"
        );
        Ok(report)
    }

    fn run_concurrent<'a>(
        &self,
        views: Vec<RegionView<'a>>,
        workers: usize,
        cancel: &CancellationFlag,
        progress: &Progress,
    ) {
        if views.is_empty() {
            return;
        }
        let queue = SegQueue::new();
        for view in views {
            queue.push(view);
        }

        thread::scope(|scope| {
            let queue = &queue;
            let spawned = (0..workers)
                .filter(|&worker| {
                    let spawn_result = thread::Builder::new()
                        .name(format!("region_worker_{worker}"))
                        .spawn_scoped(scope, move || {
                            self.work_loop(worker, cancel, progress, || queue.pop())
                        });
                    match spawn_result {
                        Ok(_) => true,
                        Err(error) => {
                            tracing::warn!(worker, %error, "failed to spawn region worker");
                            false
                        }
                    }
                })
                .count();
            if spawned == 0 {
                self.work_loop(0, cancel, progress, || queue.pop());
            }
        });
    }

    fn work_loop<'a>(
        &self,
        worker: usize,
        cancel: &CancellationFlag,
        progress: &Progress,
        mut next_view: impl FnMut() -> Option<RegionView<'a>>,
    ) {
        while !cancel.is_cancelled() {
            let Some(view) = next_view() else {
                break;
            };
            if !self.config.region_delay.is_zero() {
                thread::sleep(self.config.region_delay);
                if cancel.is_cancelled() {
                    break;
                }
            }
            self.process_region(worker, &view, progress);
        }
    }

    fn process_region(&self, worker: usize, view: &RegionView<'_>, progress: &Progress) {
        let region = view.region();
        progress.started.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            worker,
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            "processing region"
        );
        self.emit(RegionEvent::Started { worker, region });

        let color = apply_mean(view);

        progress.completed.fetch_add(1, Ordering::Relaxed);
        self.emit(RegionEvent::Completed {
            worker,
            region,
            color,
        });
    }

    fn emit(&self, event: RegionEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching progress.
            let _ = events.send(event);
        }
    }
}
