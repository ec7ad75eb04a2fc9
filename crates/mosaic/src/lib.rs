//! Raster viewer that shows an image while worker threads replace each block
//! of it with the block's mean color.

pub mod cli;
pub mod config;
pub mod io;
pub mod presentation;
pub mod processing;
pub mod surface;
pub mod window;

pub use config::{ConfigError, Rgb, RunConfig, WindowConfig};
pub use presentation::{
    EventPump, ExitReason, InputEvent, LoopExit, LoopState, PresentationConfig, PresentationLoop,
};
pub use processing::{ProcessingError, ProcessingRuntime};
pub use surface::{DisplaySurface, SurfaceError};
