use std::sync::atomic::Ordering;

use crate::shared_raster::{MAX_CHANNELS, Pixel, RegionView};

/// Per-channel mean of every pixel in `view`, rounded half up.
pub fn mean_of(view: &RegionView<'_>) -> Pixel {
    let channels = usize::from(view.channels());
    let mut sums = [0u64; MAX_CHANNELS as usize];
    for row in view.rows() {
        for pixel in row.chunks_exact(channels) {
            for (sum, byte) in sums.iter_mut().zip(pixel) {
                *sum += u64::from(byte.load(Ordering::Relaxed));
            }
        }
    }

    // Views are never empty, see `SharedRaster::view`.
    let count = view.region().pixel_count();
    let mut mean = [0u8; MAX_CHANNELS as usize];
    for (value, sum) in mean.iter_mut().zip(sums).take(channels) {
        *value = ((sum + count / 2) / count) as u8;
    }
    Pixel::from_raw(mean, view.channels())
}

/// Replaces every pixel in `view` with the view's mean color and returns it.
///
/// Touches only the bytes addressed by `view`, so callers holding disjoint
/// views of one raster may run this concurrently.
pub fn apply_mean(view: &RegionView<'_>) -> Pixel {
    let mean = mean_of(view);
    for row in view.rows() {
        for pixel in row.chunks_exact(mean.as_slice().len()) {
            for (byte, value) in pixel.iter().zip(mean.as_slice()) {
                byte.store(*value, Ordering::Relaxed);
            }
        }
    }
    mean
}
