//! Display surface shared between the presentation loop and configuration setters.
//!
//! One coarse mutex guards the layout, the backend and the raster handle. The
//! raster's pixel bytes are never guarded by it: region workers write them
//! through disjoint views while `present` copies a possibly torn frame.

use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use raster::SharedRaster;
use renderer::{FrameRequest, PresentError, PresentationBackend};
use view::{DisplayLayout, DisplayLayoutError};

use crate::config::{DEFAULT_BACKGROUND, Rgb};

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("no image has been set on the display surface")]
    EmptyImage,
    #[error("display surface is already running")]
    AlreadyRunning,
    #[error("display unavailable")]
    DisplayUnavailable(#[source] Box<dyn Error + Send + Sync>),
    #[error(transparent)]
    Layout(#[from] DisplayLayoutError),
    #[error(transparent)]
    Present(#[from] PresentError),
}

pub struct DisplaySurface<B: PresentationBackend> {
    state: Mutex<SurfaceState<B>>,
}

struct SurfaceState<B> {
    raster: Option<Arc<SharedRaster>>,
    background: Rgb,
    refresh_interval: Duration,
    layout: Option<DisplayLayout>,
    backend: Option<B>,
    last_present: Option<Instant>,
    frames_presented: u64,
    // Reused RGBA staging copy of the raster.
    frame: Vec<u8>,
}

impl<B: PresentationBackend> Default for DisplaySurface<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: PresentationBackend> DisplaySurface<B> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                raster: None,
                background: DEFAULT_BACKGROUND,
                refresh_interval: Duration::ZERO,
                layout: None,
                backend: None,
                last_present: None,
                frames_presented: 0,
                frame: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState<B>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the displayed raster. While running, the layout follows the new image size.
    pub fn set_image(&self, raster: Arc<SharedRaster>) -> Result<(), SurfaceError> {
        let mut state = self.state();
        if let Some(layout) = state.layout {
            let (window_width, window_height) = layout.window_size();
            state.layout = Some(DisplayLayout::new(
                raster.width(),
                raster.height(),
                window_width,
                window_height,
            )?);
        }
        state.raster = Some(raster);
        Ok(())
    }

    pub fn set_background_color(&self, color: Rgb) {
        self.state().background = color;
    }

    pub fn background_color(&self) -> Rgb {
        self.state().background
    }

    pub fn set_refresh_interval(&self, interval: Duration) {
        self.state().refresh_interval = interval;
    }

    pub fn refresh_interval(&self) -> Duration {
        self.state().refresh_interval
    }

    pub fn is_running(&self) -> bool {
        self.state().backend.is_some()
    }

    pub fn layout(&self) -> Option<DisplayLayout> {
        self.state().layout
    }

    pub fn frames_presented(&self) -> u64 {
        self.state().frames_presented
    }

    /// Creates the backend, computes the initial layout and presents the first frame.
    pub fn init<F, E>(&self, create_backend: F) -> Result<(), SurfaceError>
    where
        F: FnOnce() -> Result<B, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let mut state = self.state();
        let Some(raster) = state.raster.clone() else {
            return Err(SurfaceError::EmptyImage);
        };
        if state.backend.is_some() {
            return Err(SurfaceError::AlreadyRunning);
        }

        let backend =
            create_backend().map_err(|error| SurfaceError::DisplayUnavailable(error.into()))?;
        let (window_width, window_height) = backend.window_size();
        let layout =
            DisplayLayout::new(raster.width(), raster.height(), window_width, window_height)?;
        tracing::info!(
            image_width = raster.width(),
            image_height = raster.height(),
            window_width,
            window_height,
            scale = layout.scale(),
            "display surface initialized"
        );
        state.layout = Some(layout);
        state.backend = Some(backend);
        state.last_present = None;
        if let Err(error) = state.present() {
            // Not running until the first frame is shown.
            state.backend = None;
            state.layout = None;
            state.last_present = None;
            return Err(error);
        }
        Ok(())
    }

    /// Copies the live raster to the backend. Returns whether a frame was shown.
    pub fn present(&self) -> Result<bool, SurfaceError> {
        self.state().present()
    }

    /// Refits the image to a new window size and repaints. The raster keeps its size.
    pub fn on_resize(&self, width: u32, height: u32) -> Result<bool, SurfaceError> {
        let mut state = self.state();
        let SurfaceState {
            layout: Some(layout),
            backend: Some(backend),
            ..
        } = &mut *state
        else {
            return Ok(false);
        };
        layout.resize(width, height);
        backend.resize(width, height);
        tracing::debug!(
            width,
            height,
            scale = layout.scale(),
            dest_width = layout.dest_rect().width,
            dest_height = layout.dest_rect().height,
            "window resized"
        );
        state.present()
    }

    /// Whether strictly more than the refresh interval has passed since the last present.
    pub fn is_due(&self, now: Instant) -> bool {
        let state = self.state();
        if state.backend.is_none() {
            return false;
        }
        match state.last_present {
            Some(last) => now.saturating_duration_since(last) > state.refresh_interval,
            None => true,
        }
    }

    /// Time left until [`DisplaySurface::is_due`] turns true.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        let state = self.state();
        match state.last_present {
            Some(last) => state
                .refresh_interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Releases the backend. Returns `false` when the surface was not running.
    pub fn shutdown(&self) -> bool {
        let mut state = self.state();
        let Some(backend) = state.backend.take() else {
            return false;
        };
        drop(backend);
        state.layout = None;
        tracing::info!(
            frames_presented = state.frames_presented,
            "display surface shut down"
        );
        true
    }
}

impl<B: PresentationBackend> Drop for DisplaySurface<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<B: PresentationBackend> SurfaceState<B> {
    fn present(&mut self) -> Result<bool, SurfaceError> {
        let (Some(backend), Some(raster), Some(layout)) =
            (self.backend.as_mut(), self.raster.as_ref(), self.layout.as_ref())
        else {
            return Ok(false);
        };
        self.last_present = Some(Instant::now());
        if !layout.is_visible() {
            return Ok(false);
        }

        raster.snapshot_rgba8_into(&mut self.frame);
        let request = FrameRequest {
            image_width: raster.width(),
            image_height: raster.height(),
            rgba: &self.frame,
            dest_rect: layout.dest_rect(),
            background: self.background.to_array(),
        };
        match backend.present(&request) {
            Ok(()) => {
                self.frames_presented += 1;
                Ok(true)
            }
            Err(error) if !error.is_fatal() => {
                tracing::debug!(%error, "frame skipped");
                Ok(false)
            }
            Err(error) => Err(error.into()),
        }
    }
}
