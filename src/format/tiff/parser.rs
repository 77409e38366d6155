//! TIFF header and IFD parsing.
//!
//! Everything here works on byte slices that the caller has already fetched
//! through a [`RangeReader`](crate::io::RangeReader). Classic TIFF uses
//! 32-bit offsets and 12-byte entries; BigTIFF widens both to 64 bits.

use crate::error::TiffError;
use crate::io::{read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le};

use super::tags::{FieldType, TiffTag};

/// Bytes needed to identify a classic TIFF and locate its first IFD.
pub const TIFF_HEADER_SIZE: usize = 8;

/// BigTIFF adds the offset width, a reserved word and a 64-bit IFD offset.
pub const BIGTIFF_HEADER_SIZE: usize = 16;

const VERSION_TIFF: u16 = 42;
const VERSION_BIGTIFF: u16 = 43;

/// Byte order of a TIFF file, shared by its pixel samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// "II"
    LittleEndian,
    /// "MM"
    BigEndian,
}

impl ByteOrder {
    /// Identify the byte order mark at the start of a file.
    pub fn from_mark(mark: &[u8]) -> Option<Self> {
        match mark {
            b"II" => Some(ByteOrder::LittleEndian),
            b"MM" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => read_u64_le(bytes),
            ByteOrder::BigEndian => read_u64_be(bytes),
        }
    }

    #[inline]
    pub const fn is_little_endian(self) -> bool {
        matches!(self, ByteOrder::LittleEndian)
    }
}

/// The fixed header at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,
    pub is_bigtiff: bool,
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse the header from the first bytes of a file of `file_size` bytes.
    ///
    /// `bytes` needs 8 bytes for classic TIFF and 16 for BigTIFF. The first
    /// IFD offset must point inside the file.
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        let too_small = |required: usize| TiffError::FileTooSmall {
            required: required as u64,
            actual: bytes.len() as u64,
        };
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(too_small(TIFF_HEADER_SIZE));
        }

        let byte_order = ByteOrder::from_mark(&bytes[0..2])
            .ok_or_else(|| TiffError::InvalidMagic(u16::from_le_bytes([bytes[0], bytes[1]])))?;

        let (is_bigtiff, first_ifd_offset) = match byte_order.read_u16(&bytes[2..4]) {
            VERSION_TIFF => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(too_small(BIGTIFF_HEADER_SIZE));
                }
                // The reserved word at 6..8 is not checked
                let offset_width = byte_order.read_u16(&bytes[4..6]);
                if offset_width != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_width));
                }
                (true, byte_order.read_u64(&bytes[8..16]))
            }
            version => return Err(TiffError::InvalidVersion(version)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(Self {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Width of file offsets, the entry value field and the next-IFD link.
    #[inline]
    pub const fn offset_len(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Width of the entry count at the start of an IFD.
    #[inline]
    pub const fn count_len(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Tag, type, count and value field.
    #[inline]
    pub const fn entry_len(&self) -> usize {
        4 + 2 * self.offset_len()
    }

    /// Read an IFD entry count from `bytes`.
    pub fn read_count(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u16(bytes) as u64
        }
    }

    /// Read a file offset (or a BigTIFF count) from `bytes`.
    pub fn read_offset(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u32(bytes) as u64
        }
    }
}

// =============================================================================
// IFD Entries
// =============================================================================

/// A single entry of an Image File Directory.
///
/// `value_offset_bytes` holds the raw value/offset field (4 bytes for classic
/// TIFF, 8 for BigTIFF). Small values live inline in that field, larger ones
/// are stored at the offset it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    pub tag_id: u16,
    pub field_type: Option<FieldType>,
    pub field_type_raw: u16,
    pub count: u64,
    pub value_offset_bytes: Vec<u8>,
    pub is_inline: bool,
}

impl IfdEntry {
    /// Parse one entry from `bytes`, which must hold at least
    /// `header.entry_len()` bytes.
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Self {
        let byte_order = header.byte_order;
        let tag_id = byte_order.read_u16(&bytes[0..2]);
        let field_type_raw = byte_order.read_u16(&bytes[2..4]);
        let field_type = FieldType::from_u16(field_type_raw);

        let width = header.offset_len();
        let count = header.read_offset(&bytes[4..4 + width]);
        let value_offset_bytes = bytes[4 + width..4 + 2 * width].to_vec();

        let is_inline = field_type
            .map(|ft| ft.fits_inline(count, header.is_bigtiff))
            .unwrap_or(false);

        Self {
            tag_id,
            field_type,
            field_type_raw,
            count,
            value_offset_bytes,
            is_inline,
        }
    }

    /// Total size of the value in bytes, or `None` for unknown field types
    /// and counts too large to address.
    pub fn value_byte_size(&self) -> Option<u64> {
        self.field_type
            .and_then(|ft| (ft.size_in_bytes() as u64).checked_mul(self.count))
    }

    /// Interpret the value/offset field as a file offset.
    pub fn value_offset(&self, byte_order: ByteOrder) -> u64 {
        if self.value_offset_bytes.len() >= 8 {
            byte_order.read_u64(&self.value_offset_bytes)
        } else {
            byte_order.read_u32(&self.value_offset_bytes) as u64
        }
    }

    /// Read a single inline integer value, if this entry holds one.
    pub fn inline_u64(&self, byte_order: ByteOrder) -> Option<u64> {
        if !self.is_inline || self.count != 1 {
            return None;
        }
        let bytes = &self.value_offset_bytes;
        match self.field_type? {
            FieldType::Byte => Some(bytes[0] as u64),
            FieldType::Short => Some(byte_order.read_u16(bytes) as u64),
            FieldType::Long => Some(byte_order.read_u32(bytes) as u64),
            FieldType::Long8 => Some(byte_order.read_u64(bytes)),
            FieldType::Ascii | FieldType::Undefined => None,
        }
    }
}

// =============================================================================
// IFD
// =============================================================================

/// A parsed Image File Directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifd {
    pub entries: Vec<IfdEntry>,
    /// Offset of the next IFD in the chain (0 terminates the chain)
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// Number of bytes an IFD with `entry_count` entries occupies, or `None`
    /// if that does not fit in memory.
    pub fn calculate_size(entry_count: u64, header: &TiffHeader) -> Option<usize> {
        usize::try_from(entry_count)
            .ok()?
            .checked_mul(header.entry_len())?
            .checked_add(header.count_len() + header.offset_len())
    }

    /// Parse an IFD from bytes starting at the entry count field.
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Result<Self, TiffError> {
        let count_size = header.count_len();
        if bytes.len() < count_size {
            return Err(TiffError::FileTooSmall {
                required: count_size as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_count = header.read_count(&bytes[..count_size]);

        let required = Self::calculate_size(entry_count, header);
        if required.map_or(true, |required| bytes.len() < required) {
            return Err(TiffError::FileTooSmall {
                required: required.map_or(u64::MAX, |r| r as u64),
                actual: bytes.len() as u64,
            });
        }

        let entry_size = header.entry_len();
        let entries = (0..entry_count as usize)
            .map(|i| {
                let start = count_size + i * entry_size;
                IfdEntry::parse(&bytes[start..start + entry_size], header)
            })
            .collect();

        let next_start = count_size + entry_count as usize * entry_size;
        let next_ifd_offset =
            header.read_offset(&bytes[next_start..next_start + header.offset_len()]);

        Ok(Self {
            entries,
            next_ifd_offset,
        })
    }

    /// Find the entry for a tag.
    pub fn get_entry_by_tag(&self, tag: TiffTag) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag_id == tag.as_u16())
    }
}
