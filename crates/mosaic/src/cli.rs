use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use region_scheduler::{ExecutionMode, SchedulerConfig, default_worker_count};

use crate::config::{
    ConfigError, DEFAULT_KERNEL_SIZE, DEFAULT_REGION_DELAY_MS, DEFAULT_TITLE,
    DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH, Rgb, RunConfig, WindowConfig,
};

/// Show an image while worker threads replace each block with its mean color.
#[derive(Parser, Debug)]
#[command(name = "mosaic", version)]
pub struct Cli {
    /// Image to display and process.
    pub input: PathBuf,

    /// Write the processed image here when processing ends.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Side length of the square regions, in pixels.
    #[arg(short, long, default_value_t = DEFAULT_KERNEL_SIZE)]
    pub kernel_size: u32,

    /// `sequential` or `concurrent`.
    #[arg(short, long, default_value = "concurrent")]
    pub mode: ExecutionMode,

    /// Worker threads in concurrent mode [default: min(cores, 2)].
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Window background as `r,g,b` or `#rrggbb`.
    #[arg(long, default_value = "250,250,250")]
    pub background: Rgb,

    /// Minimum time between timed repaints, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub refresh_ms: u64,

    /// Simulated cost of each region, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_REGION_DELAY_MS)]
    pub region_delay_ms: u64,

    #[arg(long, default_value_t = DEFAULT_WINDOW_WIDTH)]
    pub width: u32,

    #[arg(long, default_value_t = DEFAULT_WINDOW_HEIGHT)]
    pub height: u32,

    #[arg(long, default_value = DEFAULT_TITLE)]
    pub title: String,

    /// Close the window once every region has been processed.
    #[arg(long)]
    pub close_when_done: bool,
}

impl Cli {
    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        RunConfig {
            input: self.input,
            output: self.output,
            kernel_size: self.kernel_size,
            scheduler: SchedulerConfig {
                mode: self.mode,
                worker_count: self.threads.unwrap_or_else(default_worker_count),
                region_delay: Duration::from_millis(self.region_delay_ms),
            },
            background: self.background,
            refresh_interval: Duration::from_millis(self.refresh_ms),
            window: WindowConfig {
                title: self.title,
                width: self.width,
                height: self.height,
            },
            close_when_done: self.close_when_done,
        }
        .validated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("mosaic").chain(args.iter().copied()))
    }

    #[test]
    fn minimal_invocation_uses_defaults() {
        let config = parse(&["photo.png"])
            .expect("parse")
            .into_config()
            .expect("config");
        assert_eq!(config.input, PathBuf::from("photo.png"));
        assert_eq!(config.output, None);
        assert_eq!(config.kernel_size, 100);
        assert_eq!(config.scheduler.mode, ExecutionMode::Concurrent);
        assert_eq!(config.scheduler.worker_count, default_worker_count());
        assert_eq!(config.scheduler.region_delay, Duration::from_millis(100));
        assert!(!config.close_when_done);
    }

    #[test]
    fn explicit_flags_are_applied() {
        let config = parse(&[
            "photo.png",
            "-o",
            "out.png",
            "-k",
            "16",
            "--mode",
            "sequential",
            "-t",
            "4",
            "--background",
            "#102030",
            "--refresh-ms",
            "40",
            "--region-delay-ms",
            "0",
            "--title",
            "demo",
            "--close-when-done",
        ])
        .expect("parse")
        .into_config()
        .expect("config");
        assert_eq!(config.output, Some(PathBuf::from("out.png")));
        assert_eq!(config.kernel_size, 16);
        assert_eq!(config.scheduler.mode, ExecutionMode::Sequential);
        assert_eq!(config.scheduler.worker_count, 4);
        assert_eq!(config.scheduler.region_delay, Duration::ZERO);
        assert_eq!(config.background, Rgb::new(16, 32, 48));
        assert_eq!(config.refresh_interval, Duration::from_millis(40));
        assert_eq!(config.window.title, "demo");
        assert!(config.close_when_done);
    }

    #[test]
    fn invalid_mode_is_a_parse_error() {
        assert!(parse(&["photo.png", "--mode", "turbo"]).is_err());
        assert!(parse(&["photo.png", "--background", "red"]).is_err());
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn zero_kernel_is_a_configuration_error() {
        let result = parse(&["photo.png", "-k", "0"]).expect("parse").into_config();
        assert_eq!(result, Err(ConfigError::ZeroKernel));

        let result = parse(&["photo.png", "-t", "0"]).expect("parse").into_config();
        assert_eq!(result, Err(ConfigError::ZeroThreads));
    }
}
