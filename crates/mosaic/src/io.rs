//! Image files in and out of a `SharedRaster`.

use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage, ImageFormat, ImageReader};
use raster::{RasterError, SharedRaster};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("failed to read image '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write image '{path}'")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image '{path}' cannot be held in a raster")]
    Layout {
        path: PathBuf,
        #[source]
        source: RasterError,
    },
}

/// Decodes `path` into an RGB raster, or RGBA when the file carries alpha.
pub fn load_raster(path: &Path) -> Result<SharedRaster, IoError> {
    let read_error = |source| IoError::Read {
        path: path.to_owned(),
        source,
    };
    let image = ImageReader::open(path)
        .map_err(image::ImageError::from)
        .map_err(read_error)?
        .with_guessed_format()
        .map_err(image::ImageError::from)
        .map_err(read_error)?
        .decode()
        .map_err(read_error)?;

    raster_from_image(&image).map_err(|source| IoError::Layout {
        path: path.to_owned(),
        source,
    })
}

pub fn raster_from_image(image: &DynamicImage) -> Result<SharedRaster, RasterError> {
    let (width, height) = (image.width(), image.height());
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        SharedRaster::from_bytes(width, height, 4, width as usize * 4, rgba.as_raw())
    } else {
        let rgb = image.to_rgb8();
        SharedRaster::from_bytes(width, height, 3, width as usize * 3, rgb.as_raw())
    }
}

/// Encodes the raster's current pixels to `path`; the format follows the extension.
///
/// JPEG has no alpha channel, so alpha is dropped for `.jpg` targets.
pub fn save_raster(path: &Path, raster: &SharedRaster) -> Result<(), IoError> {
    let write_error = |source| IoError::Write {
        path: path.to_owned(),
        source,
    };
    let format = ImageFormat::from_path(path).map_err(write_error)?;
    let pixels = raster.snapshot();
    let (bytes, color_type) = match (raster.channels(), format) {
        (1, _) => (pixels, ColorType::L8),
        (2, ImageFormat::Jpeg) => (drop_alpha(&pixels, 2), ColorType::L8),
        (2, _) => (pixels, ColorType::La8),
        (3, _) => (pixels, ColorType::Rgb8),
        (_, ImageFormat::Jpeg) => (drop_alpha(&pixels, 4), ColorType::Rgb8),
        (_, _) => (pixels, ColorType::Rgba8),
    };

    image::save_buffer_with_format(
        path,
        &bytes,
        raster.width(),
        raster.height(),
        color_type,
        format,
    )
    .map_err(write_error)?;
    tracing::info!(path = %path.display(), "processed image written");
    Ok(())
}

fn drop_alpha(pixels: &[u8], channels: usize) -> Vec<u8> {
    pixels
        .chunks_exact(channels)
        .flat_map(|pixel| &pixel[..channels - 1])
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_alpha_keeps_color_channels_in_order() {
        assert_eq!(drop_alpha(&[1, 2, 3, 4, 5, 6, 7, 8], 4), vec![1, 2, 3, 5, 6, 7]);
        assert_eq!(drop_alpha(&[9, 255, 8, 128], 2), vec![9, 8]);
    }

    #[test]
    fn opaque_images_become_rgb_rasters() {
        let image = DynamicImage::ImageLuma8(
            image::GrayImage::from_raw(2, 1, vec![7, 200]).expect("image"),
        );
        let raster = raster_from_image(&image).expect("raster");
        assert_eq!(raster.channels(), 3);
        assert_eq!(raster.snapshot(), vec![7, 7, 7, 200, 200, 200]);
    }
}
