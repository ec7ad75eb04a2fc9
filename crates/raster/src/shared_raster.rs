use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::Region;

pub const MAX_CHANNELS: u8 = 4;

/// One pixel value with between one and [`MAX_CHANNELS`] 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixel {
    channels: [u8; MAX_CHANNELS as usize],
    len: u8,
}

impl Pixel {
    pub fn new(values: &[u8]) -> Result<Self, RasterError> {
        let len = validate_channel_count(values.len())?;
        let mut channels = [0; MAX_CHANNELS as usize];
        channels[..values.len()].copy_from_slice(values);
        Ok(Self { channels, len })
    }

    pub(crate) const fn from_raw(channels: [u8; MAX_CHANNELS as usize], len: u8) -> Self {
        Self { channels, len }
    }

    pub const fn gray(value: u8) -> Self {
        Self {
            channels: [value, 0, 0, 0],
            len: 1,
        }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            channels: [r, g, b, a],
            len: 4,
        }
    }

    pub fn channel_count(&self) -> u8 {
        self.len
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.channels[..usize::from(self.len)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    #[error("raster width/height must be non-zero")]
    ZeroSized,
    #[error("channel count {0} is outside 1..=4")]
    InvalidChannelCount(usize),
    #[error("stride ({stride}) is smaller than minimum ({min_stride})")]
    StrideTooSmall { stride: usize, min_stride: usize },
    #[error("raster needs {expected} bytes, got {actual}")]
    ByteLengthMismatch { expected: usize, actual: usize },
    #[error("size overflow while computing {0}")]
    SizeOverflow(&'static str),
    #[error("region {region:?} is empty or exceeds raster bounds {width}x{height}")]
    RegionOutOfBounds {
        region: Region,
        width: u32,
        height: u32,
    },
    #[error("pixel has {actual} channels, raster has {expected}")]
    ChannelMismatch { expected: u8, actual: u8 },
}

/// Row-major 8-bit raster whose dimensions and layout are fixed at creation.
///
/// Pixel bytes are individually atomic so any number of threads may read and
/// write through `&SharedRaster` without a lock. Accesses are `Relaxed`:
/// writers that need their results observed rely on a join or channel for
/// ordering, and concurrent readers may observe a partially updated frame.
pub struct SharedRaster {
    width: u32,
    height: u32,
    channels: u8,
    stride: usize,
    bytes: Box<[AtomicU8]>,
}

impl fmt::Debug for SharedRaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRaster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}

impl SharedRaster {
    /// Zero-filled raster with tightly packed rows.
    pub fn new(width: u32, height: u32, channels: u8) -> Result<Self, RasterError> {
        let row_bytes = validate_dimensions(width, height, channels)?;
        let total = total_bytes(row_bytes, height)?;
        Ok(Self {
            width,
            height,
            channels,
            stride: row_bytes,
            bytes: (0..total).map(|_| AtomicU8::new(0)).collect(),
        })
    }

    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Result<Self, RasterError> {
        let raster = Self::new(width, height, pixel.channel_count())?;
        raster.view(raster.full_region())?.fill(pixel)?;
        Ok(raster)
    }

    /// Copies `bytes`, laid out as `height` rows of `stride` bytes each.
    pub fn from_bytes(
        width: u32,
        height: u32,
        channels: u8,
        stride: usize,
        bytes: &[u8],
    ) -> Result<Self, RasterError> {
        let row_bytes = validate_dimensions(width, height, channels)?;
        if stride < row_bytes {
            return Err(RasterError::StrideTooSmall {
                stride,
                min_stride: row_bytes,
            });
        }
        let expected = total_bytes(stride, height)?;
        if bytes.len() != expected {
            return Err(RasterError::ByteLengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            stride,
            bytes: bytes.iter().copied().map(AtomicU8::new).collect(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Distance in bytes between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Bytes of pixel data per row, excluding stride padding.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * usize::from(self.channels)
    }

    pub fn full_region(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    pub fn view(&self, region: Region) -> Result<RegionView<'_>, RasterError> {
        if region.is_empty() || !region.fits_within(self.width, self.height) {
            return Err(RasterError::RegionOutOfBounds {
                region,
                width: self.width,
                height: self.height,
            });
        }
        Ok(RegionView {
            raster: self,
            region,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = self.offset(x, y);
        let channels = usize::from(self.channels);
        let mut values = [0; MAX_CHANNELS as usize];
        for (value, byte) in values
            .iter_mut()
            .zip(&self.bytes[offset..offset + channels])
        {
            *value = load(byte);
        }
        Some(Pixel::from_raw(values, self.channels))
    }

    pub fn set_pixel(&self, x: u32, y: u32, pixel: Pixel) -> Result<(), RasterError> {
        self.view(Region::new(x, y, 1, 1))?.fill(pixel)
    }

    /// Copy of the pixel data with padding stripped.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.row_bytes() * self.height as usize);
        for y in 0..self.height {
            out.extend(self.row(y).iter().map(load));
        }
        out
    }

    /// Copy of the backing store, stride padding included.
    pub fn raw_bytes(&self) -> Vec<u8> {
        self.bytes.iter().map(load).collect()
    }

    pub fn snapshot_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.snapshot_rgba8_into(&mut out);
        out
    }

    /// Expands the live contents to tightly packed RGBA8, reusing `out`.
    ///
    /// Gray is replicated into RGB; missing alpha becomes opaque.
    pub fn snapshot_rgba8_into(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            let row = self.row(y);
            match self.channels {
                1 => {
                    for byte in row {
                        let value = load(byte);
                        out.extend_from_slice(&[value, value, value, u8::MAX]);
                    }
                }
                2 => {
                    for pair in row.chunks_exact(2) {
                        let value = load(&pair[0]);
                        out.extend_from_slice(&[value, value, value, load(&pair[1])]);
                    }
                }
                3 => {
                    for rgb in row.chunks_exact(3) {
                        out.extend_from_slice(&[
                            load(&rgb[0]),
                            load(&rgb[1]),
                            load(&rgb[2]),
                            u8::MAX,
                        ]);
                    }
                }
                _ => out.extend(row.iter().map(load)),
            }
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride + x as usize * usize::from(self.channels)
    }

    fn row(&self, y: u32) -> &[AtomicU8] {
        let start = y as usize * self.stride;
        &self.bytes[start..start + self.row_bytes()]
    }
}

/// Non-owning window onto exactly one region of a [`SharedRaster`].
#[derive(Debug, Clone, Copy)]
pub struct RegionView<'a> {
    raster: &'a SharedRaster,
    region: Region,
}

impl<'a> RegionView<'a> {
    pub fn region(&self) -> Region {
        self.region
    }

    pub fn channels(&self) -> u8 {
        self.raster.channels
    }

    /// Row slices covering only the region's columns, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &'a [AtomicU8]> + 'a {
        let raster = self.raster;
        let region = self.region;
        let start_column = raster.offset(region.x, 0);
        let len = region.width as usize * usize::from(raster.channels);
        (region.y..region.y + region.height).map(move |y| {
            let start = y as usize * raster.stride + start_column;
            &raster.bytes[start..start + len]
        })
    }

    pub fn fill(&self, pixel: Pixel) -> Result<(), RasterError> {
        if pixel.channel_count() != self.channels() {
            return Err(RasterError::ChannelMismatch {
                expected: self.channels(),
                actual: pixel.channel_count(),
            });
        }
        let values = pixel.as_slice();
        for row in self.rows() {
            for target in row.chunks_exact(values.len()) {
                for (byte, value) in target.iter().zip(values) {
                    byte.store(*value, Ordering::Relaxed);
                }
            }
        }
        Ok(())
    }

    /// The single color of the region, if every pixel holds the same value.
    pub fn uniform_color(&self) -> Option<Pixel> {
        let first = self.raster.pixel(self.region.x, self.region.y)?;
        let values = first.as_slice();
        self.rows()
            .all(|row| {
                row.chunks_exact(values.len())
                    .all(|pixel| pixel.iter().map(load).eq(values.iter().copied()))
            })
            .then_some(first)
    }

    /// Copy of the region's bytes, rows packed back to back.
    pub fn to_vec(&self) -> Vec<u8> {
        self.rows().flat_map(|row| row.iter().map(load)).collect()
    }
}

fn load(byte: &AtomicU8) -> u8 {
    byte.load(Ordering::Relaxed)
}

fn validate_channel_count(channels: usize) -> Result<u8, RasterError> {
    if channels == 0 || channels > usize::from(MAX_CHANNELS) {
        return Err(RasterError::InvalidChannelCount(channels));
    }
    Ok(channels as u8)
}

fn validate_dimensions(width: u32, height: u32, channels: u8) -> Result<usize, RasterError> {
    if width == 0 || height == 0 {
        return Err(RasterError::ZeroSized);
    }
    validate_channel_count(usize::from(channels))?;
    (width as usize)
        .checked_mul(usize::from(channels))
        .ok_or(RasterError::SizeOverflow("row bytes"))
}

fn total_bytes(stride: usize, height: u32) -> Result<usize, RasterError> {
    stride
        .checked_mul(height as usize)
        .ok_or(RasterError::SizeOverflow("raster bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_rejects_bad_layouts() {
        assert_eq!(
            SharedRaster::from_bytes(0, 2, 1, 0, &[]).unwrap_err(),
            RasterError::ZeroSized
        );
        assert_eq!(
            SharedRaster::from_bytes(2, 2, 5, 10, &[0; 20]).unwrap_err(),
            RasterError::InvalidChannelCount(5)
        );
        assert_eq!(
            SharedRaster::from_bytes(4, 2, 3, 8, &[0; 16]).unwrap_err(),
            RasterError::StrideTooSmall {
                stride: 8,
                min_stride: 12
            }
        );
        assert_eq!(
            SharedRaster::from_bytes(2, 2, 1, 4, &[0; 7]).unwrap_err(),
            RasterError::ByteLengthMismatch {
                expected: 8,
                actual: 7
            }
        );
    }

    #[test]
    fn padded_stride_is_stripped_from_snapshots() {
        #[rustfmt::skip]
        let bytes = [
            1, 2, 0xEE, 0xEE,
            3, 4, 0xEE, 0xEE,
        ];
        let raster = SharedRaster::from_bytes(2, 2, 1, 4, &bytes).expect("raster");
        assert_eq!(raster.stride(), 4);
        assert_eq!(raster.snapshot(), vec![1, 2, 3, 4]);
        assert_eq!(raster.pixel(1, 1), Some(Pixel::gray(4)));
        assert_eq!(raster.pixel(2, 0), None);
    }

    #[test]
    fn view_rejects_regions_outside_bounds() {
        let raster = SharedRaster::new(4, 4, 1).expect("raster");
        assert!(raster.view(Region::new(0, 0, 4, 4)).is_ok());
        assert!(matches!(
            raster.view(Region::new(2, 2, 3, 1)),
            Err(RasterError::RegionOutOfBounds { .. })
        ));
        assert!(matches!(
            raster.view(Region::new(0, 0, 0, 1)),
            Err(RasterError::RegionOutOfBounds { .. })
        ));
    }

    #[test]
    fn fill_writes_only_inside_region() {
        let raster = SharedRaster::new(4, 3, 2).expect("raster");
        let view = raster.view(Region::new(1, 1, 2, 1)).expect("view");
        let color = Pixel::new(&[7, 9]).expect("pixel");
        view.fill(color).expect("fill");

        for y in 0..3 {
            for x in 0..4 {
                let expected = if y == 1 && (1..3).contains(&x) {
                    [7, 9]
                } else {
                    [0, 0]
                };
                assert_eq!(
                    raster.pixel(x, y).expect("pixel").as_slice(),
                    &expected,
                    "pixel ({x}, {y})"
                );
            }
        }
        assert_eq!(view.uniform_color(), Some(color));
    }

    #[test]
    fn fill_rejects_channel_mismatch() {
        let raster = SharedRaster::new(2, 2, 3).expect("raster");
        let view = raster.view(raster.full_region()).expect("view");
        assert_eq!(
            view.fill(Pixel::gray(1)),
            Err(RasterError::ChannelMismatch {
                expected: 3,
                actual: 1
            })
        );
    }

    #[test]
    fn rgba_snapshot_expands_gray_and_rgb() {
        let gray = SharedRaster::from_bytes(2, 1, 1, 2, &[10, 20]).expect("gray");
        assert_eq!(
            gray.snapshot_rgba8(),
            vec![10, 10, 10, 255, 20, 20, 20, 255]
        );

        let rgb = SharedRaster::from_bytes(1, 1, 3, 3, &[1, 2, 3]).expect("rgb");
        assert_eq!(rgb.snapshot_rgba8(), vec![1, 2, 3, 255]);

        let gray_alpha = SharedRaster::from_bytes(1, 1, 2, 2, &[5, 128]).expect("gray alpha");
        assert_eq!(gray_alpha.snapshot_rgba8(), vec![5, 5, 5, 128]);
    }

    #[test]
    fn concurrent_writers_to_disjoint_views_all_land() {
        let raster = SharedRaster::new(8, 8, 1).expect("raster");
        std::thread::scope(|scope| {
            for (index, column) in [0u32, 4].into_iter().enumerate() {
                let raster = &raster;
                scope.spawn(move || {
                    raster
                        .view(Region::new(column, 0, 4, 8))
                        .expect("view")
                        .fill(Pixel::gray(index as u8 + 1))
                        .expect("fill");
                });
            }
        });
        assert_eq!(raster.pixel(0, 7), Some(Pixel::gray(1)));
        assert_eq!(raster.pixel(7, 0), Some(Pixel::gray(2)));
    }
}
