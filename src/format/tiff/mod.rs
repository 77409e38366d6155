//! Minimal TIFF/BigTIFF structure parsing.
//!
//! Only what is needed to walk the IFD chain and locate uncompressed strips:
//! header, IFD entries, and integer tag values.

mod parser;
mod tags;
mod values;

pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{FieldType, SampleFormat, TiffTag, COMPRESSION_NONE};
pub use values::{parse_u64_array, ValueReader};
