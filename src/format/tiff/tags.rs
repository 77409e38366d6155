//! The subset of TIFF vocabulary needed to locate uncompressed strips and
//! derive the sample layout of a plane.

/// Encoding of the values in an IFD entry. Rational and signed types are
/// never needed and parse as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Undefined = 7,
    /// BigTIFF only
    Long8 = 16,
}

impl FieldType {
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::Undefined => 1,
            FieldType::Short => 2,
            FieldType::Long => 4,
            FieldType::Long8 => 8,
        }
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        [
            FieldType::Byte,
            FieldType::Ascii,
            FieldType::Short,
            FieldType::Long,
            FieldType::Undefined,
            FieldType::Long8,
        ]
        .into_iter()
        .find(|ft| *ft as u16 == value)
    }

    /// Whether `count` values fit in the entry's value field (4 bytes, or 8
    /// in BigTIFF) instead of being stored at an offset.
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let field_len = if is_bigtiff { 8 } else { 4 };
        (self.size_in_bytes() as u64)
            .checked_mul(count)
            .is_some_and(|len| len <= field_len)
    }
}

/// Tags the plane reader looks at. Everything else is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    ImageWidth = 256,
    ImageLength = 257,
    BitsPerSample = 258,
    Compression = 259,
    StripOffsets = 273,
    SamplesPerPixel = 277,
    StripByteCounts = 279,
    /// Presence marks a tiled file, which is rejected
    TileWidth = 322,
    TileOffsets = 324,
    SampleFormat = 339,
}

impl TiffTag {
    const ALL: [TiffTag; 10] = [
        TiffTag::ImageWidth,
        TiffTag::ImageLength,
        TiffTag::BitsPerSample,
        TiffTag::Compression,
        TiffTag::StripOffsets,
        TiffTag::SamplesPerPixel,
        TiffTag::StripByteCounts,
        TiffTag::TileWidth,
        TiffTag::TileOffsets,
        TiffTag::SampleFormat,
    ];

    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_u16() == value)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Tag name for error messages.
    pub const fn name(self) -> &'static str {
        match self {
            TiffTag::ImageWidth => "ImageWidth",
            TiffTag::ImageLength => "ImageLength",
            TiffTag::BitsPerSample => "BitsPerSample",
            TiffTag::Compression => "Compression",
            TiffTag::StripOffsets => "StripOffsets",
            TiffTag::SamplesPerPixel => "SamplesPerPixel",
            TiffTag::StripByteCounts => "StripByteCounts",
            TiffTag::TileWidth => "TileWidth",
            TiffTag::TileOffsets => "TileOffsets",
            TiffTag::SampleFormat => "SampleFormat",
        }
    }
}

/// Compression tag value for uncompressed data.
pub const COMPRESSION_NONE: u16 = 1;

/// How the bits of a sample are interpreted. Void (4) and complex formats
/// are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SampleFormat {
    /// The default when the tag is absent
    Unsigned = 1,
    Signed = 2,
    Float = 3,
}

impl SampleFormat {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(SampleFormat::Unsigned),
            2 => Some(SampleFormat::Signed),
            3 => Some(SampleFormat::Float),
            _ => None,
        }
    }
}
