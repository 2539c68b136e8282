//! RAW format export for game engine compatibility.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::field::Field;
use crate::geometry::Shape;

/// Errors that can occur during RAW export.
#[derive(Error, Debug)]
pub enum RawExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid value range: min ({0}) >= max ({1})")]
    InvalidRange(f32, f32),
}

/// RAW export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawFormat {
    /// 16-bit unsigned integer, little-endian (Unity default).
    #[default]
    R16LittleEndian,
    /// 16-bit unsigned integer, big-endian.
    R16BigEndian,
    /// 32-bit float, little-endian (high precision).
    R32Float,
}

impl RawFormat {
    /// Bytes written per cell.
    pub fn bytes_per_cell(&self) -> u64 {
        match self {
            RawFormat::R16LittleEndian | RawFormat::R16BigEndian => 2,
            RawFormat::R32Float => 4,
        }
    }
}

/// Exports a field as a headerless RAW dump in flat (row-major) cell order.
///
/// R16 formats normalize against `[min_value, max_value]`; `R32Float` writes the
/// values unchanged and ignores the range.
pub fn export_field_raw(
    field: &Field<f32>,
    path: &Path,
    format: RawFormat,
    min_value: f32,
    max_value: f32,
) -> Result<(), RawExportError> {
    if format != RawFormat::R32Float && min_value >= max_value {
        return Err(RawExportError::InvalidRange(min_value, max_value));
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let range = max_value - min_value;
    let quantize = |value: f32| (((value - min_value) / range).clamp(0.0, 1.0) * 65535.0) as u16;

    match format {
        RawFormat::R16LittleEndian => {
            for &value in field.iter() {
                writer.write_all(&quantize(value).to_le_bytes())?;
            }
        }
        RawFormat::R16BigEndian => {
            for &value in field.iter() {
                writer.write_all(&quantize(value).to_be_bytes())?;
            }
        }
        RawFormat::R32Float => {
            for &value in field.iter() {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
    }

    writer.flush()?;
    log::debug!("Wrote {} {:?} cells to {}", field.elem(), format, path.display());
    Ok(())
}

/// Returns the expected file size for a RAW export.
pub fn expected_file_size(shape: &Shape, format: RawFormat) -> u64 {
    shape.elem() as u64 * format.bytes_per_cell()
}
