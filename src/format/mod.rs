//! Built-in image format support.
//!
//! The importer itself only depends on the [`reader`](crate::reader) traits;
//! this module provides one implementation of them for uncompressed TIFF
//! and BigTIFF stacks.

pub mod detect;
mod stack;
pub mod tiff;
mod tiff_reader;

pub use detect::{is_tiff_header, probe_tiff};
pub use stack::{pixel_type_for, PlaneLayout, PlaneStack};
pub use tiff_reader::TiffImageReader;
