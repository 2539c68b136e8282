//! Export module for saving fields to image and raw files.
//!
//! Supports 16-bit PNG for quick inspection and RAW formats
//! for game engine imports.

mod png;
mod raw;

pub use png::{export_field_png, PngExportError, PngExportOptions};
pub use raw::{export_field_raw, expected_file_size, RawExportError, RawFormat};
