#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mosaic::{EventPump, InputEvent};
use raster::SharedRaster;
use renderer::{FrameRequest, PresentError, PresentationBackend};
use view::DestRect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedFrame {
    pub rgba: Vec<u8>,
    pub dest_rect: DestRect,
    pub background: [u8; 3],
}

/// Shared record of everything a `FakeBackend` was asked to do.
#[derive(Debug, Clone, Default)]
pub struct BackendLog {
    frames: Arc<Mutex<Vec<PresentedFrame>>>,
    resizes: Arc<Mutex<Vec<(u32, u32)>>>,
    errors: Arc<Mutex<VecDeque<PresentError>>>,
    released: Arc<AtomicBool>,
}

impl BackendLog {
    pub fn frames(&self) -> Vec<PresentedFrame> {
        self.frames.lock().expect("frames lock").clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().expect("frames lock").len()
    }

    pub fn last_frame(&self) -> Option<PresentedFrame> {
        self.frames.lock().expect("frames lock").last().cloned()
    }

    pub fn resizes(&self) -> Vec<(u32, u32)> {
        self.resizes.lock().expect("resizes lock").clone()
    }

    pub fn fail_next_present(&self, error: PresentError) {
        self.errors.lock().expect("errors lock").push_back(error);
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

pub struct FakeBackend {
    size: (u32, u32),
    max_texture_dimension: u32,
    log: BackendLog,
}

impl FakeBackend {
    pub fn new(width: u32, height: u32, log: &BackendLog) -> Self {
        Self {
            size: (width, height),
            max_texture_dimension: u32::MAX,
            log: log.clone(),
        }
    }

    pub fn with_max_texture_dimension(mut self, max_texture_dimension: u32) -> Self {
        self.max_texture_dimension = max_texture_dimension;
        self
    }
}

impl PresentationBackend for FakeBackend {
    fn window_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.log.resizes.lock().expect("resizes lock").push((width, height));
    }

    fn present(&mut self, frame: &FrameRequest<'_>) -> Result<(), PresentError> {
        frame.validate()?;
        frame.check_texture_limit(self.max_texture_dimension)?;
        if let Some(error) = self.log.errors.lock().expect("errors lock").pop_front() {
            return Err(error);
        }
        self.log.frames.lock().expect("frames lock").push(PresentedFrame {
            rgba: frame.rgba.to_vec(),
            dest_rect: frame.dest_rect,
            background: frame.background,
        });
        Ok(())
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.log.released.store(true, Ordering::SeqCst);
    }
}

/// Replays scripted event batches, then idles until `idle_limit` pumps have passed.
pub struct ScriptedPump {
    batches: VecDeque<Vec<InputEvent>>,
    idle_pumps: usize,
    idle_limit: usize,
}

impl ScriptedPump {
    pub fn new(batches: Vec<Vec<InputEvent>>) -> Self {
        Self {
            batches: batches.into(),
            idle_pumps: 0,
            idle_limit: 5_000,
        }
    }

    /// Never sends input; quits after `idle_limit` pumps so a hung test still ends.
    pub fn idle() -> Self {
        Self::new(Vec::new())
    }
}

impl EventPump for ScriptedPump {
    fn pump(&mut self, _timeout: Duration) -> Vec<InputEvent> {
        if let Some(batch) = self.batches.pop_front() {
            std::thread::sleep(Duration::from_millis(1));
            return batch;
        }
        self.idle_pumps += 1;
        if self.idle_pumps >= self.idle_limit {
            return vec![InputEvent::Quit];
        }
        std::thread::sleep(Duration::from_millis(1));
        Vec::new()
    }
}

pub fn noise_raster(width: u32, height: u32, channels: u8, seed: u64) -> SharedRaster {
    let mut state = seed.max(1);
    let len = width as usize * height as usize * usize::from(channels);
    let bytes: Vec<u8> = (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect();
    SharedRaster::from_bytes(
        width,
        height,
        channels,
        width as usize * usize::from(channels),
        &bytes,
    )
    .expect("noise raster")
}
