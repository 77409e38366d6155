//! Reader capability traits.
//!
//! The importer never decodes image formats itself. It talks to a reader
//! through these narrow traits:
//!
//! - [`FileGrouper`]: maps logical names to local paths and reports which
//!   files make up the dataset opened from a given name
//! - [`SeriesReader`]: dimensions and sample layout of the current series
//! - [`PlaneReader`]: raw plane bytes in the reader's byte order
//! - [`MetadataSource`]: the OME-XML document describing the dataset
//!
//! [`ImageReader`] bundles all of them and is what [`Importer`](crate::Importer)
//! is generic over.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{FormatError, MetadataError};
use crate::metadata::MetadataDocument;

// =============================================================================
// PixelType
// =============================================================================

/// Pixel sample types, keyed by the integer codes readers report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum PixelType {
    Int8 = 0,
    Uint8 = 1,
    Int16 = 2,
    Uint16 = 3,
    Int32 = 4,
    Uint32 = 5,
    Float = 6,
    Double = 7,
}

impl PixelType {
    /// Size of one sample in bytes.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelType::Int8 | PixelType::Uint8 => 1,
            PixelType::Int16 | PixelType::Uint16 => 2,
            PixelType::Int32 | PixelType::Uint32 | PixelType::Float => 4,
            PixelType::Double => 8,
        }
    }

    /// Floating point types count as signed.
    pub const fn is_signed(self) -> bool {
        !matches!(
            self,
            PixelType::Uint8 | PixelType::Uint16 | PixelType::Uint32
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, PixelType::Float | PixelType::Double)
    }

    /// The lowercase OME 2003 token, e.g. `uint16` or `float`.
    pub const fn as_str(self) -> &'static str {
        match self {
            PixelType::Int8 => "int8",
            PixelType::Uint8 => "uint8",
            PixelType::Int16 => "int16",
            PixelType::Uint16 => "uint16",
            PixelType::Int32 => "int32",
            PixelType::Uint32 => "uint32",
            PixelType::Float => "float",
            PixelType::Double => "double",
        }
    }

    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for PixelType {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(PixelType::Int8),
            1 => Ok(PixelType::Uint8),
            2 => Ok(PixelType::Int16),
            3 => Ok(PixelType::Uint16),
            4 => Ok(PixelType::Int32),
            5 => Ok(PixelType::Uint32),
            6 => Ok(PixelType::Float),
            7 => Ok(PixelType::Double),
            other => Err(other),
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Capability traits
// =============================================================================

/// Resolves logical file names and reports file grouping.
#[async_trait]
pub trait FileGrouper: Send {
    /// Register the local path for a logical file name.
    fn map_id(&mut self, name: &str, path: &str);

    /// Local path previously registered for `name`.
    fn mapped_path(&self, name: &str) -> Option<&str>;

    /// Whether the file registered as `name` is in a format this reader
    /// handles. Never fails; unreadable files are simply not recognized.
    async fn is_recognized_format(&mut self, name: &str) -> bool;

    /// Open the dataset starting from `name`, replacing any open dataset.
    async fn set_id(&mut self, name: &str) -> Result<(), FormatError>;

    /// Names of all files consumed by the open dataset.
    ///
    /// `None` when no dataset is open. Individual entries may be `None` when
    /// the reader cannot name one of its files.
    fn used_files(&self) -> Option<Vec<Option<String>>>;
}

/// Dimensions and sample layout of the current series.
pub trait SeriesReader: Send {
    fn series_count(&self) -> usize;

    fn set_series(&mut self, series: usize) -> Result<(), FormatError>;

    fn size_x(&self) -> u32;
    fn size_y(&self) -> u32;
    fn size_z(&self) -> u32;
    fn size_c(&self) -> u32;
    fn size_t(&self) -> u32;

    /// Raw pixel type code, see [`PixelType`]. Codes outside that table
    /// are passed through so callers can report them.
    fn pixel_type(&self) -> i32;

    /// Byte order of the bytes returned by [`PlaneReader::open_bytes`].
    fn is_little_endian(&self) -> bool;

    /// Number of planes as the reader stores them.
    fn image_count(&self) -> usize;

    /// Linear plane index for a (z, c, t) coordinate.
    fn index(&self, z: u32, c: u32, t: u32) -> Result<usize, FormatError>;
}

/// Reads raw plane bytes of the current series.
#[async_trait]
pub trait PlaneReader: SeriesReader {
    async fn open_bytes(&mut self, index: usize) -> Result<Bytes, FormatError>;
}

/// Produces the metadata document of the open dataset.
pub trait MetadataSource {
    /// Must contain one `Pixels` element per series, in series order.
    fn metadata_document(&self) -> Result<MetadataDocument, MetadataError>;
}

/// Everything the importer needs from a reader.
#[async_trait]
pub trait ImageReader: FileGrouper + PlaneReader + MetadataSource {
    /// Release the open dataset. Safe to call when nothing is open.
    async fn close(&mut self) -> Result<(), FormatError>;
}
