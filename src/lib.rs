//! # OMEIS Import
//!
//! Imports microscopy image files held by an OME Image Server (OMEIS) and
//! produces the OME-XML metadata describing the imported pixels.
//!
//! Given a set of OMEIS file IDs, the importer
//!
//! 1. resolves the files to local paths and checks that they form exactly
//!    one dataset according to the image reader,
//! 2. reads every series plane by plane in XYZCT order, byte-swapping
//!    samples when the file and OMEIS disagree on endianness,
//! 3. streams the planes into newly allocated OMEIS pixels buffers,
//! 4. writes the resulting pixels IDs and SHA1 digests into the metadata
//!    document.
//!
//! ## Architecture
//!
//! - [`omeis`] - OMEIS line protocol and typed client
//! - [`reader`] - Capability traits the importer needs from an image reader
//! - [`mod@format`] - Built-in reader for uncompressed TIFF/BigTIFF stacks
//! - [`metadata`] - OME-XML element tree and output store
//! - [`import`] - Group resolution, transcoding and the [`Importer`]
//! - [`io`] - Range reads over local files
//! - [`config`] / [`output`] - CLI configuration and CGI framing
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use omeis_import::{HttpTransport, Importer, OmeisClient, TiffImageReader};
//!
//! # async fn run() -> Result<(), omeis_import::ImportError> {
//! let transport = HttpTransport::new("http://localhost/cgi-bin/omeis", Duration::from_secs(60))?;
//! let mut importer = Importer::new(TiffImageReader::new(), OmeisClient::new(transport));
//!
//! let xml = importer.import_ids(&[5, 6, 7]).await?.into_xml()?;
//! println!("{}", xml);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod import;
pub mod io;
pub mod metadata;
pub mod omeis;
pub mod output;
pub mod reader;

// Re-export commonly used types
pub use config::Config;
pub use error::{
    ErrorKind, FormatError, ImportError, IoError, MetadataError, OmeisError, TiffError,
};
pub use format::TiffImageReader;
pub use import::{DiscoveredGroup, FileGroup, ImportOutcome, Importer, SeriesResult};
pub use io::{LocalRangeReader, RangeReader};
pub use metadata::{Element, MetadataDocument, MetadataStore};
pub use omeis::{HttpTransport, OmeisClient, OmeisTransport, PixelsLayout};
pub use output::ResponseMode;
pub use reader::{
    FileGrouper, ImageReader, MetadataSource, PixelType, PlaneReader, SeriesReader,
};
