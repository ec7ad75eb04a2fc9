/// Pixel rectangle inside the window that the image is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DestRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DestRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Fit of a fixed-size image into a resizable window.
///
/// The image keeps its aspect ratio, scaled by the smaller of the two axis
/// ratios, and is anchored at the window origin. A zero-sized window (a
/// minimized one) yields scale 0 and an empty destination rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayLayout {
    image_width: u32,
    image_height: u32,
    window_width: u32,
    window_height: u32,
    scale: f64,
    dest_rect: DestRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DisplayLayoutError {
    #[error("image size {width}x{height} has a zero dimension")]
    EmptyImage { width: u32, height: u32 },
}

impl DisplayLayout {
    pub fn new(
        image_width: u32,
        image_height: u32,
        window_width: u32,
        window_height: u32,
    ) -> Result<Self, DisplayLayoutError> {
        if image_width == 0 || image_height == 0 {
            return Err(DisplayLayoutError::EmptyImage {
                width: image_width,
                height: image_height,
            });
        }
        let mut layout = Self {
            image_width,
            image_height,
            window_width: 0,
            window_height: 0,
            scale: 0.0,
            dest_rect: DestRect::default(),
        };
        layout.resize(window_width, window_height);
        Ok(layout)
    }

    /// Recomputes scale and destination for a new window size. The image size is fixed.
    pub fn resize(&mut self, window_width: u32, window_height: u32) {
        self.window_width = window_width;
        self.window_height = window_height;

        let image_width = u64::from(self.image_width);
        let image_height = u64::from(self.image_height);
        let window_width = u64::from(window_width);
        let window_height = u64::from(window_height);

        // Compare ww/iw against wh/ih without rounding, then floor the other axis.
        let width_limited = window_width * image_height <= window_height * image_width;
        let (dest_width, dest_height) = if width_limited {
            self.scale = window_width as f64 / image_width as f64;
            (window_width, image_height * window_width / image_width)
        } else {
            self.scale = window_height as f64 / image_height as f64;
            (image_width * window_height / image_height, window_height)
        };

        // Both are bounded by the window size, which came in as u32.
        self.dest_rect = DestRect {
            x: 0,
            y: 0,
            width: dest_width as u32,
            height: dest_height as u32,
        };
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn dest_rect(&self) -> DestRect {
        self.dest_rect
    }

    pub fn is_visible(&self) -> bool {
        !self.dest_rect.is_empty()
    }
}
