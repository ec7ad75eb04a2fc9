//! Shared pixel raster and the region arithmetic built on top of it.
//!
//! - `shared_raster`: `SharedRaster`, a fixed-layout byte raster writable through `&self`,
//!   and `RegionView`, a non-owning window onto one `Region` of it.
//! - `partition`: splits a raster into a row-major grid of `kernel_size` squares.
//! - `transform`: block-mean transform applied through a `RegionView`.

mod partition;
mod shared_raster;
mod transform;

pub use partition::{Partition, PartitionError, partition};
pub use shared_raster::{MAX_CHANNELS, Pixel, RasterError, RegionView, SharedRaster};
pub use transform::{apply_mean, mean_of};

/// Axis-aligned rectangle in raster coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        u64::from(x) >= u64::from(self.x)
            && u64::from(x) < self.right()
            && u64::from(y) >= u64::from(self.y)
            && u64::from(y) < self.bottom()
    }

    pub fn intersects(&self, other: &Region) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        u64::from(self.x) < other.right()
            && u64::from(other.x) < self.right()
            && u64::from(self.y) < other.bottom()
            && u64::from(other.y) < self.bottom()
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= u64::from(width) && self.bottom() <= u64::from(height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_regions_do_not_intersect() {
        let left = Region::new(0, 0, 4, 4);
        let right = Region::new(4, 0, 4, 4);
        let below = Region::new(0, 4, 4, 4);
        assert!(!left.intersects(&right));
        assert!(!left.intersects(&below));
        assert!(left.intersects(&Region::new(3, 3, 2, 2)));
    }

    #[test]
    fn empty_region_never_intersects() {
        let empty = Region::new(1, 1, 0, 5);
        assert!(empty.is_empty());
        assert!(!empty.intersects(&Region::new(0, 0, 10, 10)));
    }

    #[test]
    fn edges_do_not_overflow_near_u32_max() {
        let region = Region::new(u32::MAX - 1, 0, 2, 1);
        assert_eq!(region.right(), u64::from(u32::MAX) + 1);
        assert!(!region.fits_within(u32::MAX, 1));
        assert!(region.contains(u32::MAX, 0));
    }
}
