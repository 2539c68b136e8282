//! PNG export functionality for scalar fields.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, ImageEncoder, Luma};
use thiserror::Error;

use crate::field::Field;

/// Errors that can occur during PNG export.
#[derive(Error, Debug)]
pub enum PngExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid value range: min ({0}) >= max ({1})")]
    InvalidRange(f32, f32),
    #[error("PNG export requires a 2D field, got {0} dimensions")]
    NotTwoDimensional(usize),
    #[error("Field extents {0:?} exceed PNG limits")]
    TooLarge(Vec<usize>),
}

/// Options for PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// Value mapped to black.
    pub min_value: f32,
    /// Value mapped to white.
    pub max_value: f32,
    /// PNG compression type.
    pub compression: CompressionType,
    /// PNG filter type.
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            min_value: 0.0,
            max_value: 1.0,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngExportOptions {
    /// Creates options spanning the field's own value range.
    ///
    /// A constant field gets a unit-wide range so it exports as black.
    pub fn auto_range(field: &Field<f32>) -> Self {
        let (min, mut max) = field.range();
        if min >= max {
            max = min + 1.0;
        }
        Self {
            min_value: min,
            max_value: max,
            ..Default::default()
        }
    }
}

fn image_extents(field: &Field<f32>) -> Result<(u32, u32), PngExportError> {
    let shape = field.shape();
    if shape.dims() != 2 {
        return Err(PngExportError::NotTwoDimensional(shape.dims()));
    }
    let width = u32::try_from(shape.extent(0));
    let height = u32::try_from(shape.extent(1));
    match (width, height) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(PngExportError::TooLarge(shape.extents().to_vec())),
    }
}

/// Exports a 2D field as a 16-bit grayscale PNG.
///
/// The first dimension runs along image columns and the second along rows, so
/// cell `[x, y]` becomes pixel `(x, y)`. Values are normalized against the
/// option range and clamped.
pub fn export_field_png(
    field: &Field<f32>,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), PngExportError> {
    let min = options.min_value;
    let max = options.max_value;

    if min >= max {
        return Err(PngExportError::InvalidRange(min, max));
    }

    let (width, height) = image_extents(field)?;
    let data = field.as_slice();
    let range = max - min;

    let img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(width, height, |x, y| {
        let value = data[x as usize * height as usize + y as usize];
        let normalized = ((value - min) / range).clamp(0.0, 1.0);
        Luma([(normalized * 65535.0) as u16])
    });

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);

    // Convert u16 slice to bytes for the encoder
    let byte_slice: &[u8] = bytemuck::cast_slice(img.as_raw());

    encoder.write_image(byte_slice, width, height, image::ExtendedColorType::L16)?;

    log::debug!("Wrote {}x{} PNG to {}", width, height, path.display());
    Ok(())
}
