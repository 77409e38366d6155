//! TIFF tag value reading.
//!
//! Values are either stored inline in the IFD entry or at an offset in the
//! file. Arrays such as StripOffsets are fetched with a single range read.

use bytes::Bytes;

use crate::error::{IoError, TiffError};
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader};
use super::tags::{FieldType, TiffTag};

/// Reads tag values from a TIFF file, respecting its byte order and
/// classic/BigTIFF layout.
pub struct ValueReader<'a, R: RangeReader> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Read raw bytes for an IFD entry's value.
    ///
    /// Values larger than the file fail with `RangeOutOfBounds` before any
    /// buffer is allocated.
    pub async fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        if entry.field_type.is_none() {
            return Err(TiffError::UnknownFieldType(entry.field_type_raw));
        }

        if entry.is_inline {
            let size = entry.value_byte_size().unwrap_or(0) as usize;
            return Ok(Bytes::copy_from_slice(&entry.value_offset_bytes[..size]));
        }

        let offset = entry.value_offset(self.header.byte_order);
        let len = entry
            .value_byte_size()
            .and_then(|size| usize::try_from(size).ok())
            .ok_or(IoError::RangeOutOfBounds {
                offset,
                requested: u64::MAX,
                size: self.reader.size(),
            })?;
        Ok(self.reader.read_exact_at(offset, len).await?)
    }

    /// Size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.reader.size()
    }

    /// Read a tag that must hold exactly one integer.
    pub async fn read_scalar(&self, tag: TiffTag, entry: &IfdEntry) -> Result<u64, TiffError> {
        if entry.count != 1 {
            return Err(TiffError::InvalidTagValue {
                tag: tag.name(),
                message: format!("expected count 1, got {}", entry.count),
            });
        }
        if let Some(value) = entry.inline_u64(self.header.byte_order) {
            return Ok(value);
        }
        let values = self.read_u64_array(tag, entry).await?;
        values.first().copied().ok_or(TiffError::MissingTag(tag.name()))
    }

    /// Read an integer array (Byte, Short, Long or Long8) widened to u64.
    pub async fn read_u64_array(
        &self,
        tag: TiffTag,
        entry: &IfdEntry,
    ) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.count == 0 {
            return Ok(Vec::new());
        }
        if matches!(field_type, FieldType::Ascii | FieldType::Undefined) {
            return Err(TiffError::InvalidTagValue {
                tag: tag.name(),
                message: format!("expected an integer type, got {:?}", field_type),
            });
        }

        let bytes = self.read_bytes(entry).await?;
        Ok(parse_u64_array(
            &bytes,
            entry.count as usize,
            field_type,
            self.header.byte_order,
        ))
    }
}

/// Parse an array of integers from raw bytes.
///
/// Elements that would run past the end of `bytes` are dropped.
pub fn parse_u64_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Vec<u64> {
    let width = field_type.size_in_bytes();
    bytes
        .chunks_exact(width)
        .take(count)
        .filter_map(|chunk| match field_type {
            FieldType::Byte => Some(chunk[0] as u64),
            FieldType::Short => Some(byte_order.read_u16(chunk) as u64),
            FieldType::Long => Some(byte_order.read_u32(chunk) as u64),
            FieldType::Long8 => Some(byte_order.read_u64(chunk)),
            FieldType::Ascii | FieldType::Undefined => None,
        })
        .collect()
}
