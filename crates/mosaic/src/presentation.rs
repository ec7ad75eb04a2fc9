use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use region_scheduler::{CancellationFlag, RegionEvent, RunReport};
use renderer::PresentationBackend;

use crate::surface::{DisplaySurface, SurfaceError};

// Keeps a zero refresh interval from spinning while nothing can be drawn.
const MIN_WAIT: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    EscapePressed,
    Resized { width: u32, height: u32 },
}

/// Source of window input for the presentation loop.
pub trait EventPump {
    /// Waits at most `timeout` and returns the events that arrived, oldest first.
    ///
    /// A closed event source reports `InputEvent::Quit`.
    fn pump(&mut self, timeout: Duration) -> Vec<InputEvent>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    Escape,
    ProcessingFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopExit {
    pub reason: ExitReason,
    pub frames_presented: u64,
    pub regions_completed: usize,
    /// Report of the processing run, when it finished before the loop stopped.
    pub processing: Option<RunReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentationConfig {
    pub close_when_done: bool,
    /// Upper bound on one event wait, so completion is noticed without input.
    pub max_wait: Duration,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            close_when_done: false,
            max_wait: Duration::from_millis(50),
        }
    }
}

pub struct PresentationLoop {
    config: PresentationConfig,
    state: LoopState,
    progress: Option<Receiver<RegionEvent>>,
    completion: Option<Receiver<RunReport>>,
}

impl PresentationLoop {
    pub fn new(config: PresentationConfig) -> Self {
        Self {
            config,
            state: LoopState::Stopped,
            progress: None,
            completion: None,
        }
    }

    /// Region events to count. A completed region triggers a repaint on the next iteration.
    pub fn with_progress(mut self, progress: Receiver<RegionEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Receives the run report once processing ends, triggering one final repaint.
    pub fn with_completion(mut self, completion: Receiver<RunReport>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Pumps input and repaints until quit, escape, or (if configured) processing completes.
    ///
    /// Every exit path sets `cancel`. Nothing is presented after the loop
    /// leaves the running state.
    pub fn run<B, P>(
        &mut self,
        surface: &DisplaySurface<B>,
        events: &mut P,
        cancel: &CancellationFlag,
    ) -> Result<LoopExit, SurfaceError>
    where
        B: PresentationBackend,
        P: EventPump + ?Sized,
    {
        self.state = LoopState::Running;
        tracing::debug!("presentation loop started");
        let mut exit = LoopExit {
            reason: ExitReason::Quit,
            frames_presented: 0,
            regions_completed: 0,
            processing: None,
        };

        let result = self.run_until_stopped(surface, events, &mut exit);
        self.state = LoopState::Stopped;
        cancel.cancel();
        match &result {
            Ok(()) => tracing::info!(
                reason = ?exit.reason,
                frames = exit.frames_presented,
                "presentation loop stopped"
            ),
            Err(error) => tracing::error!(%error, "presentation loop failed"),
        }
        result.map(|()| exit)
    }

    fn run_until_stopped<B, P>(
        &mut self,
        surface: &DisplaySurface<B>,
        events: &mut P,
        exit: &mut LoopExit,
    ) -> Result<(), SurfaceError>
    where
        B: PresentationBackend,
        P: EventPump + ?Sized,
    {
        loop {
            let timeout = surface
                .time_until_due(Instant::now())
                .max(MIN_WAIT)
                .min(self.config.max_wait);
            for event in events.pump(timeout) {
                match event {
                    InputEvent::Quit => {
                        exit.reason = ExitReason::Quit;
                        return Ok(());
                    }
                    InputEvent::EscapePressed => {
                        exit.reason = ExitReason::Escape;
                        return Ok(());
                    }
                    InputEvent::Resized { width, height } => {
                        if surface.on_resize(width, height)? {
                            exit.frames_presented += 1;
                        }
                    }
                }
            }

            // Completion first: every region event was sent before the report.
            let finished_now = self.poll_completion(exit);
            let newly_completed = self.drain_progress();
            exit.regions_completed += newly_completed;

            let repaint = finished_now || newly_completed > 0;
            if (repaint || surface.is_due(Instant::now())) && surface.present()? {
                exit.frames_presented += 1;
            }

            if self.config.close_when_done
                && exit.processing.is_some_and(|report| report.is_complete())
            {
                exit.reason = ExitReason::ProcessingFinished;
                return Ok(());
            }
        }
    }

    fn drain_progress(&self) -> usize {
        self.progress.as_ref().map_or(0, |progress| {
            progress
                .try_iter()
                .filter(|event| matches!(event, RegionEvent::Completed { .. }))
                .count()
        })
    }

    /// Returns `true` on the iteration the processing thread reports back.
    fn poll_completion(&mut self, exit: &mut LoopExit) -> bool {
        let Some(completion) = &self.completion else {
            return false;
        };
        match completion.try_recv() {
            Ok(report) => {
                exit.processing = Some(report);
                self.completion = None;
                true
            }
            Err(TryRecvError::Disconnected) => {
                self.completion = None;
                true
            }
            Err(TryRecvError::Empty) => false,
        }
    }
}
