//! Presentation backends for the live raster.
//!
//! `PresentationBackend` is the seam the display surface drives; `GpuPresenter`
//! implements it with a winit window and a wgpu surface.

mod presenter_frame;
mod presenter_init;

#[cfg(test)]
mod wgsl_tests;

use std::sync::Arc;

use view::DestRect;
use winit::window::Window;

/// One frame to draw: an RGBA8 image scaled into `dest_rect` over `background`.
#[derive(Debug, Clone, Copy)]
pub struct FrameRequest<'a> {
    pub image_width: u32,
    pub image_height: u32,
    /// Tightly packed RGBA8 rows, `image_width * image_height * 4` bytes.
    pub rgba: &'a [u8],
    pub dest_rect: DestRect,
    pub background: [u8; 3],
}

impl FrameRequest<'_> {
    pub fn expected_len(&self) -> usize {
        self.image_width as usize * self.image_height as usize * 4
    }

    pub fn validate(&self) -> Result<(), PresentError> {
        let expected = self.expected_len();
        if self.image_width == 0 || self.image_height == 0 || self.rgba.len() != expected {
            return Err(PresentError::FrameSizeMismatch {
                width: self.image_width,
                height: self.image_height,
                expected,
                actual: self.rgba.len(),
            });
        }
        Ok(())
    }

    /// Rejects images that do not fit in one texture of at most `max_dimension` texels per side.
    pub fn check_texture_limit(&self, max_dimension: u32) -> Result<(), PresentError> {
        if self.image_width > max_dimension || self.image_height > max_dimension {
            return Err(PresentError::ImageTooLarge {
                width: self.image_width,
                height: self.image_height,
                max_dimension,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresentError {
    #[error("frame has {actual} bytes, expected {expected} for a {width}x{height} RGBA image")]
    FrameSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("{width}x{height} image exceeds the device texture limit of {max_dimension}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_dimension: u32,
    },
    /// The frame was dropped; the next present may succeed.
    #[error("frame skipped: {0}")]
    Skipped(String),
    #[error("presentation backend failed: {0}")]
    Fatal(String),
}

impl PresentError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PresentError::Skipped(_))
    }
}

/// Render target the display surface presents into. Dropping it releases the target.
pub trait PresentationBackend: Send {
    /// Current drawable size in physical pixels.
    fn window_size(&self) -> (u32, u32);

    fn resize(&mut self, width: u32, height: u32);

    fn present(&mut self, frame: &FrameRequest<'_>) -> Result<(), PresentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GpuPresenterError {
    #[error("failed to create the window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible graphics adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to open the graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("window surface reports no supported texture format")]
    NoSurfaceFormat,
}

pub struct GpuPresenter {
    window: Arc<Window>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    image: Option<ImageTexture>,
}

struct ImageTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl PresentationBackend for GpuPresenter {
    fn window_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.resize_surface(width, height);
    }

    fn present(&mut self, frame: &FrameRequest<'_>) -> Result<(), PresentError> {
        self.present_frame(frame)
    }
}

/// Linear value of one sRGB-encoded channel, as wgpu clear colors expect.
pub fn srgb_to_linear(channel: u8) -> f64 {
    let encoded = f64::from(channel) / 255.0;
    if encoded <= 0.04045 {
        encoded / 12.92
    } else {
        ((encoded + 0.055) / 1.055).powf(2.4)
    }
}

/// Clear color for `background` on a target that is (or is not) sRGB-encoded.
pub fn clear_color(background: [u8; 3], srgb_target: bool) -> wgpu::Color {
    let [r, g, b] = background.map(|channel| {
        if srgb_target {
            srgb_to_linear(channel)
        } else {
            f64::from(channel) / 255.0
        }
    });
    wgpu::Color { r, g, b, a: 1.0 }
}
