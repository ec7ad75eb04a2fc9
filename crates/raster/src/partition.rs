use crate::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PartitionError {
    #[error("kernel size must be greater than zero")]
    ZeroKernel,
    #[error("cannot partition an empty {width}x{height} raster")]
    EmptyRaster { width: u32, height: u32 },
}

/// Row-major grid of `kernel_size` squares covering a `width` x `height` raster.
///
/// The last column and row are clipped to the raster bounds, so the yielded
/// regions tile the raster exactly once. A clone continues from the same
/// cursor; [`Partition::restarted`] iterates again from the first region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    width: u32,
    height: u32,
    kernel_size: u32,
    row: u32,
    column: u32,
    remaining: usize,
}

pub fn partition(width: u32, height: u32, kernel_size: u32) -> Result<Partition, PartitionError> {
    if kernel_size == 0 {
        return Err(PartitionError::ZeroKernel);
    }
    if width == 0 || height == 0 {
        return Err(PartitionError::EmptyRaster { width, height });
    }
    let mut grid = Partition {
        width,
        height,
        kernel_size,
        row: 0,
        column: 0,
        remaining: 0,
    };
    grid.remaining = grid.columns() as usize * grid.rows() as usize;
    Ok(grid)
}

impl Partition {
    pub fn columns(&self) -> u32 {
        self.width.div_ceil(self.kernel_size)
    }

    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.kernel_size)
    }

    pub fn restarted(&self) -> Self {
        let mut grid = self.clone();
        grid.row = 0;
        grid.column = 0;
        grid.remaining = grid.columns() as usize * grid.rows() as usize;
        grid
    }
}

impl Iterator for Partition {
    type Item = Region;

    fn next(&mut self) -> Option<Region> {
        if self.remaining == 0 {
            return None;
        }
        let region = Region {
            x: self.column,
            y: self.row,
            width: self.kernel_size.min(self.width - self.column),
            height: self.kernel_size.min(self.height - self.row),
        };
        self.remaining -= 1;
        match self.column.checked_add(self.kernel_size) {
            Some(next_column) if next_column < self.width => self.column = next_column,
            _ => {
                self.column = 0;
                self.row = self.row.saturating_add(self.kernel_size);
            }
        }
        Some(region)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Partition {}

impl std::iter::FusedIterator for Partition {}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(width: u32, height: u32, kernel_size: u32) -> Vec<u32> {
        let mut hits = vec![0u32; width as usize * height as usize];
        for region in partition(width, height, kernel_size).expect("partition") {
            assert!(region.fits_within(width, height), "{region:?} out of bounds");
            assert!(!region.is_empty());
            for y in region.y..region.y + region.height {
                for x in region.x..region.x + region.width {
                    hits[y as usize * width as usize + x as usize] += 1;
                }
            }
        }
        hits
    }

    #[test]
    fn regions_tile_raster_exactly_once() {
        for (width, height, kernel_size) in [
            (8, 8, 4),
            (10, 7, 3),
            (1, 1, 5),
            (13, 29, 1),
            (100, 64, 100),
            (17, 5, 16),
        ] {
            assert!(
                coverage(width, height, kernel_size)
                    .iter()
                    .all(|hits| *hits == 1),
                "{width}x{height} k={kernel_size} does not tile exactly once"
            );
        }
    }

    #[test]
    fn regions_are_pairwise_disjoint() {
        let regions: Vec<Region> = partition(23, 11, 5).expect("partition").collect();
        for (index, left) in regions.iter().enumerate() {
            for right in &regions[index + 1..] {
                assert!(!left.intersects(right), "{left:?} overlaps {right:?}");
            }
        }
    }

    #[test]
    fn steps_row_major_and_clips_last_row_and_column() {
        let regions: Vec<Region> = partition(10, 7, 4).expect("partition").collect();
        assert_eq!(
            regions,
            vec![
                Region::new(0, 0, 4, 4),
                Region::new(4, 0, 4, 4),
                Region::new(8, 0, 2, 4),
                Region::new(0, 4, 4, 3),
                Region::new(4, 4, 4, 3),
                Region::new(8, 4, 2, 3),
            ]
        );
    }

    #[test]
    fn reports_exact_length_and_grid() {
        let mut grid = partition(10, 7, 4).expect("partition");
        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.len(), 6);
        grid.next();
        assert_eq!(grid.len(), 5);
    }

    #[test]
    fn restarted_replays_the_same_sequence() {
        let mut grid = partition(9, 9, 4).expect("partition");
        let first: Vec<Region> = grid.by_ref().collect();
        assert_eq!(grid.next(), None);
        let second: Vec<Region> = grid.restarted().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_invalid_arguments() {
        assert_eq!(partition(8, 8, 0), Err(PartitionError::ZeroKernel));
        assert_eq!(
            partition(0, 8, 4),
            Err(PartitionError::EmptyRaster {
                width: 0,
                height: 8
            })
        );
    }

    #[test]
    fn huge_kernel_near_u32_max_does_not_overflow() {
        let regions: Vec<Region> = partition(u32::MAX, 1, u32::MAX - 1)
            .expect("partition")
            .collect();
        assert_eq!(
            regions,
            vec![Region::new(0, 0, u32::MAX - 1, 1), Region::new(u32::MAX - 1, 0, 1, 1)]
        );
    }
}
