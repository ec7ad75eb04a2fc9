use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use region_scheduler::SchedulerConfig;

pub const DEFAULT_KERNEL_SIZE: u32 = 100;
pub const DEFAULT_REGION_DELAY_MS: u64 = 100;
pub const DEFAULT_WINDOW_WIDTH: u32 = 1000;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 1000;
pub const MAX_WINDOW_DIMENSION: u32 = 8192;
pub const DEFAULT_TITLE: &str = "Image Convolution";
pub const DEFAULT_BACKGROUND: Rgb = Rgb::new(250, 250, 250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        DEFAULT_BACKGROUND
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color `{0}`, expected `r,g,b` or `#rrggbb`")]
pub struct ParseRgbError(String);

impl FromStr for Rgb {
    type Err = ParseRgbError;

    /// Accepts `r,g,b` with decimal components or `#rrggbb`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseRgbError(value.to_owned());
        let trimmed = value.trim();

        if let Some(hex) = trimmed.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(invalid());
            }
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
            };
            return Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?));
        }

        let mut parts = trimmed.split(',').map(|part| part.trim().parse::<u8>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) => Ok(Rgb::new(r, g, b)),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
        }
    }
}

/// Validated settings for one viewer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub kernel_size: u32,
    pub scheduler: SchedulerConfig,
    pub background: Rgb,
    pub refresh_interval: Duration,
    pub window: WindowConfig,
    pub close_when_done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("kernel size must be greater than zero")]
    ZeroKernel,
    #[error("thread count must be greater than zero")]
    ZeroThreads,
    #[error("window size {width}x{height} has a zero dimension")]
    EmptyWindow { width: u32, height: u32 },
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            kernel_size: DEFAULT_KERNEL_SIZE,
            scheduler: SchedulerConfig {
                region_delay: Duration::from_millis(DEFAULT_REGION_DELAY_MS),
                ..SchedulerConfig::default()
            },
            background: DEFAULT_BACKGROUND,
            refresh_interval: Duration::ZERO,
            window: WindowConfig::default(),
            close_when_done: false,
        }
    }

    /// Rejects unusable settings and clamps the window to `MAX_WINDOW_DIMENSION`.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.kernel_size == 0 {
            return Err(ConfigError::ZeroKernel);
        }
        if self.scheduler.worker_count == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        let WindowConfig { width, height, .. } = self.window;
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyWindow { width, height });
        }
        if width > MAX_WINDOW_DIMENSION || height > MAX_WINDOW_DIMENSION {
            tracing::warn!(
                width,
                height,
                max = MAX_WINDOW_DIMENSION,
                "requested window size clamped"
            );
            self.window.width = width.min(MAX_WINDOW_DIMENSION);
            self.window.height = height.min(MAX_WINDOW_DIMENSION);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex_colors() {
        assert_eq!("250,250,250".parse(), Ok(Rgb::new(250, 250, 250)));
        assert_eq!(" 1, 2 ,3 ".parse(), Ok(Rgb::new(1, 2, 3)));
        assert_eq!("#FF8000".parse(), Ok(Rgb::new(255, 128, 0)));
        assert_eq!("#0a0b0c".parse(), Ok(Rgb::new(10, 11, 12)));
    }

    #[test]
    fn rejects_malformed_colors() {
        for input in ["", "1,2", "1,2,3,4", "256,0,0", "-1,0,0", "#fff", "#gg0000", "#ééé"] {
            assert!(input.parse::<Rgb>().is_err(), "{input:?} should not parse");
        }
    }

    #[test]
    fn color_display_round_trips_through_parse() {
        let color = Rgb::new(9, 99, 199);
        assert_eq!(color.to_string().parse(), Ok(color));
    }

    #[test]
    fn defaults_follow_viewer_conventions() {
        let config = RunConfig::new("in.png").validated().expect("defaults are valid");
        assert_eq!(config.kernel_size, 100);
        assert_eq!(config.background, Rgb::new(250, 250, 250));
        assert_eq!(config.scheduler.region_delay, Duration::from_millis(100));
        assert_eq!(config.window.title, "Image Convolution");
        assert_eq!((config.window.width, config.window.height), (1000, 1000));
        assert_eq!(config.refresh_interval, Duration::ZERO);
    }

    #[test]
    fn validation_rejects_zero_values() {
        let mut config = RunConfig::new("in.png");
        config.kernel_size = 0;
        assert_eq!(config.validated(), Err(ConfigError::ZeroKernel));

        let mut config = RunConfig::new("in.png");
        config.scheduler.worker_count = 0;
        assert_eq!(config.validated(), Err(ConfigError::ZeroThreads));

        let mut config = RunConfig::new("in.png");
        config.window.height = 0;
        assert_eq!(
            config.validated(),
            Err(ConfigError::EmptyWindow {
                width: 1000,
                height: 0
            })
        );
    }

    #[test]
    fn oversized_window_is_clamped() {
        let mut config = RunConfig::new("in.png");
        config.window.width = 100_000;
        let config = config.validated().expect("clamped");
        assert_eq!(config.window.width, MAX_WINDOW_DIMENSION);
        assert_eq!(config.window.height, 1000);
    }
}
