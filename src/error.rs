use std::fmt;

use thiserror::Error;

/// I/O errors that can occur when reading local image files
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Requested range exceeds file bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File does not exist or is not mapped to a local path
    #[error("File not found: {0}")]
    NotFound(String),

    /// Any other local filesystem failure
    #[error("I/O error on {path}: {message}")]
    Local { path: String, message: String },
}

/// Errors returned while talking to the OMEIS pixel service
#[derive(Debug, Clone, Error)]
pub enum OmeisError {
    /// The request could not be delivered or the service answered with an HTTP error
    #[error("OMEIS {method} call failed: {message}")]
    Transport { method: String, message: String },

    /// The service answered, but the body is empty or malformed
    #[error("Invalid OMEIS {method} response: {message}")]
    Protocol { method: String, message: String },

    /// A file or pixels ID could not be resolved
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Errors related to file grouping, pixel layout and format support
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// TIFF parsing error
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// File format is not supported by the reader
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    /// An import was requested without any file IDs
    #[error("No file IDs to import")]
    NoFileIds,

    /// The reader could not report which files it consumed
    #[error("Invalid file list for {path}")]
    InvalidFileList { path: String },

    /// The reader consumed a different number of files than were requested
    #[error("File list length mismatch for {path}: used={used}; ids={ids}")]
    FileListLengthMismatch {
        path: String,
        used: String,
        ids: String,
    },

    /// The reader consumed files that were not requested
    #[error("File list does not correspond to ID list for {path}")]
    FileListMismatch { path: String },

    /// Pixel type code outside the supported table
    #[error("Unknown pixel type for '{id}' series #{series}: {code}")]
    UnknownPixelType { id: String, series: usize, code: i32 },

    /// The metadata document and the reader disagree on the number of series
    #[error("Pixels element count ({found}) does not match series count ({expected}) for '{id}'")]
    PixelsCountMismatch {
        id: String,
        found: usize,
        expected: usize,
    },

    /// A reader query was made before any file was opened
    #[error("No file has been opened")]
    NoFileOpen,

    /// Series index outside `0..series_count`
    #[error("Series #{series} out of range ({count} series)")]
    SeriesOutOfRange { series: usize, count: usize },

    /// Plane coordinates or index outside the current series
    #[error("Plane {what} out of range for series with {count} planes")]
    PlaneOutOfRange { what: String, count: usize },
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Compressed pixel data
    #[error("Unsupported compression: {0} (only uncompressed data is supported)")]
    UnsupportedCompression(u16),

    /// File uses tiles instead of strips
    #[error("Unsupported organization: file uses tiles instead of strips")]
    TileOrganization,

    /// IFDs in one file do not describe planes of the same shape
    #[error("IFD #{ifd} does not match the first plane: {message}")]
    InconsistentPlanes { ifd: usize, message: String },

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors raised while reading or writing OME-XML
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    /// Underlying XML reader or writer failure
    #[error("XML error: {0}")]
    Xml(String),

    /// Well-formed XML that does not describe a single-rooted document
    #[error("Malformed metadata document: {0}")]
    Malformed(String),
}

impl From<quick_xml::Error> for MetadataError {
    fn from(err: quick_xml::Error) -> Self {
        MetadataError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for MetadataError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        MetadataError::Xml(err.to_string())
    }
}

/// Coarse classification of an [`ImportError`], used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    NotFound,
    Format,
    Metadata,
    Io,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Protocol => "protocol",
            ErrorKind::NotFound => "not found",
            ErrorKind::Format => "format",
            ErrorKind::Metadata => "metadata",
            ErrorKind::Io => "i/o",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any failure that aborts an import or a group test.
///
/// None of these are retried; they propagate to `main`, which reports them
/// once per output channel.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Omeis(#[from] OmeisError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Writing the pixels file handed out by OMEIS failed
    #[error("Failed to write pixels file {path}")]
    Sink {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::Omeis(OmeisError::Transport { .. }) => ErrorKind::Transport,
            ImportError::Omeis(OmeisError::Protocol { .. }) => ErrorKind::Protocol,
            ImportError::Omeis(OmeisError::NotFound(_)) => ErrorKind::NotFound,
            ImportError::Format(FormatError::Io(IoError::NotFound(_))) => ErrorKind::NotFound,
            ImportError::Format(_) => ErrorKind::Format,
            ImportError::Metadata(_) => ErrorKind::Metadata,
            ImportError::Sink { .. } => ErrorKind::Io,
        }
    }
}
