//! Uncompressed strip-organized TIFF planes.
//!
//! Every IFD of a file is one plane. All planes must share width, height
//! and sample layout; pixel data is read strip by strip in file byte order.

use std::collections::HashSet;

use bytes::Bytes;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;
use crate::reader::PixelType;

use super::tiff::{
    Ifd, SampleFormat, TiffHeader, TiffTag, ValueReader, BIGTIFF_HEADER_SIZE, COMPRESSION_NONE,
    TIFF_HEADER_SIZE,
};

/// Upper bound on the IFD chain length, guards against corrupt files.
const MAX_IFDS: usize = 65_536;

// =============================================================================
// PlaneLayout
// =============================================================================

/// Geometry and strip locations of one plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneLayout {
    pub width: u32,
    pub height: u32,
    pub pixel_type: PixelType,
    pub strip_offsets: Vec<u64>,
    pub strip_byte_counts: Vec<u64>,
}

impl PlaneLayout {
    /// Read and validate the layout described by an IFD.
    ///
    /// # Errors
    /// - `UnsupportedCompression` unless the data is uncompressed
    /// - `TileOrganization` if the IFD carries tile tags
    /// - `InvalidTagValue` for multi-sample pixels or unsupported sample types
    /// - `MissingTag` if the size or strip tags are absent
    /// - `InvalidTagValue` if one plane would not fit in the file
    pub async fn from_ifd<R: RangeReader>(
        ifd: &Ifd,
        values: &ValueReader<'_, R>,
    ) -> Result<Self, TiffError> {
        let compression = read_scalar(ifd, values, TiffTag::Compression, Some(1)).await?;
        if compression != COMPRESSION_NONE as u64 {
            return Err(TiffError::UnsupportedCompression(compression as u16));
        }

        if ifd.get_entry_by_tag(TiffTag::TileWidth).is_some()
            || ifd.get_entry_by_tag(TiffTag::TileOffsets).is_some()
        {
            return Err(TiffError::TileOrganization);
        }

        let samples = read_scalar(ifd, values, TiffTag::SamplesPerPixel, Some(1)).await?;
        if samples != 1 {
            return Err(TiffError::InvalidTagValue {
                tag: TiffTag::SamplesPerPixel.name(),
                message: format!("expected 1 sample per pixel, got {}", samples),
            });
        }

        let width = read_scalar(ifd, values, TiffTag::ImageWidth, None).await?;
        let height = read_scalar(ifd, values, TiffTag::ImageLength, None).await?;
        let bits = read_scalar(ifd, values, TiffTag::BitsPerSample, Some(1)).await?;
        let format = read_scalar(ifd, values, TiffTag::SampleFormat, Some(1)).await?;
        let pixel_type = pixel_type_for(bits, format)?;

        let strip_offsets = read_array(ifd, values, TiffTag::StripOffsets).await?;
        let strip_byte_counts = read_array(ifd, values, TiffTag::StripByteCounts).await?;
        if strip_offsets.len() != strip_byte_counts.len() {
            return Err(TiffError::InvalidTagValue {
                tag: TiffTag::StripByteCounts.name(),
                message: format!(
                    "{} byte counts for {} strips",
                    strip_byte_counts.len(),
                    strip_offsets.len()
                ),
            });
        }

        let plane = Self {
            width: to_u32(TiffTag::ImageWidth, width)?,
            height: to_u32(TiffTag::ImageLength, height)?,
            pixel_type,
            strip_offsets,
            strip_byte_counts,
        };
        plane.checked_size(values.file_size())?;
        Ok(plane)
    }

    /// Bytes in one uncompressed plane, or `None` if that overflows u64.
    pub fn plane_size(&self) -> Option<u64> {
        (self.width as u64)
            .checked_mul(self.height as u64)?
            .checked_mul(self.pixel_type.bytes_per_pixel() as u64)
    }

    /// Plane size as a buffer length, rejected when a file of `file_size`
    /// bytes cannot hold it.
    fn checked_size(&self, file_size: u64) -> Result<usize, TiffError> {
        self.plane_size()
            .filter(|size| *size <= file_size)
            .and_then(|size| usize::try_from(size).ok())
            .ok_or_else(|| TiffError::InvalidTagValue {
                tag: TiffTag::ImageWidth.name(),
                message: format!(
                    "{}x{} {} plane does not fit in a {}-byte file",
                    self.width, self.height, self.pixel_type, file_size
                ),
            })
    }

    /// Read the raw bytes of this plane.
    ///
    /// Strips are concatenated and cut to exactly one plane; rows padded
    /// past the image height in the last strip are dropped.
    pub async fn read<R: RangeReader>(&self, reader: &R) -> Result<Bytes, TiffError> {
        let plane_size = self.checked_size(reader.size())?;

        let strips = self.strip_offsets.iter().zip(&self.strip_byte_counts);
        let mut data = Vec::with_capacity(plane_size);
        for (&offset, &count) in strips {
            let remaining = plane_size - data.len();
            if remaining == 0 {
                break;
            }
            let len = usize::try_from(count).map_or(remaining, |count| count.min(remaining));
            let strip = reader.read_exact_at(offset, len).await?;
            data.extend_from_slice(&strip);
        }

        if data.len() < plane_size {
            return Err(TiffError::InvalidTagValue {
                tag: TiffTag::StripByteCounts.name(),
                message: format!(
                    "strips hold {} bytes, plane needs {}",
                    data.len(),
                    plane_size
                ),
            });
        }

        Ok(Bytes::from(data))
    }

    /// Describe how `other` differs in shape from this plane, if it does.
    fn shape_mismatch(&self, other: &PlaneLayout) -> Option<String> {
        if (self.width, self.height) != (other.width, other.height) {
            Some(format!(
                "size {}x{} differs from {}x{}",
                other.width, other.height, self.width, self.height
            ))
        } else if self.pixel_type != other.pixel_type {
            Some(format!(
                "pixel type {} differs from {}",
                other.pixel_type, self.pixel_type
            ))
        } else {
            None
        }
    }
}

/// Map BitsPerSample and SampleFormat onto a pixel type.
pub fn pixel_type_for(bits: u64, sample_format: u64) -> Result<PixelType, TiffError> {
    let format = u16::try_from(sample_format)
        .ok()
        .and_then(SampleFormat::from_u16)
        .ok_or_else(|| TiffError::InvalidTagValue {
            tag: TiffTag::SampleFormat.name(),
            message: format!("unsupported sample format {}", sample_format),
        })?;

    match (bits, format) {
        (8, SampleFormat::Signed) => Ok(PixelType::Int8),
        (8, SampleFormat::Unsigned) => Ok(PixelType::Uint8),
        (16, SampleFormat::Signed) => Ok(PixelType::Int16),
        (16, SampleFormat::Unsigned) => Ok(PixelType::Uint16),
        (32, SampleFormat::Signed) => Ok(PixelType::Int32),
        (32, SampleFormat::Unsigned) => Ok(PixelType::Uint32),
        (32, SampleFormat::Float) => Ok(PixelType::Float),
        (64, SampleFormat::Float) => Ok(PixelType::Double),
        _ => Err(TiffError::InvalidTagValue {
            tag: TiffTag::BitsPerSample.name(),
            message: format!("unsupported {}-bit {:?} samples", bits, format),
        }),
    }
}

async fn read_scalar<R: RangeReader>(
    ifd: &Ifd,
    values: &ValueReader<'_, R>,
    tag: TiffTag,
    default: Option<u64>,
) -> Result<u64, TiffError> {
    match ifd.get_entry_by_tag(tag) {
        Some(entry) => values.read_scalar(tag, entry).await,
        None => default.ok_or(TiffError::MissingTag(tag.name())),
    }
}

async fn read_array<R: RangeReader>(
    ifd: &Ifd,
    values: &ValueReader<'_, R>,
    tag: TiffTag,
) -> Result<Vec<u64>, TiffError> {
    let entry = ifd
        .get_entry_by_tag(tag)
        .ok_or(TiffError::MissingTag(tag.name()))?;
    values.read_u64_array(tag, entry).await
}

fn to_u32(tag: TiffTag, value: u64) -> Result<u32, TiffError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!("invalid dimension {}", value),
        })
}

// =============================================================================
// PlaneStack
// =============================================================================

/// All planes of a TIFF file, in IFD order.
#[derive(Debug, Clone)]
pub struct PlaneStack {
    pub header: TiffHeader,
    pub planes: Vec<PlaneLayout>,
}

impl PlaneStack {
    /// Parse the header and every IFD of a file.
    pub async fn parse<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let header_len = (reader.size() as usize).min(BIGTIFF_HEADER_SIZE);
        if header_len < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: reader.size(),
            });
        }
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = Self::parse_all_ifds(reader, &header).await?;
        if ifds.is_empty() {
            return Err(TiffError::InvalidIfdOffset(header.first_ifd_offset));
        }

        let values = ValueReader::new(reader, &header);
        let mut planes: Vec<PlaneLayout> = Vec::with_capacity(ifds.len());
        for (index, ifd) in ifds.iter().enumerate() {
            let plane = PlaneLayout::from_ifd(ifd, &values).await?;
            if let Some(message) = planes.first().and_then(|first| first.shape_mismatch(&plane)) {
                return Err(TiffError::InconsistentPlanes {
                    ifd: index,
                    message,
                });
            }
            planes.push(plane);
        }

        debug!(
            file = reader.identifier(),
            planes = planes.len(),
            bigtiff = header.is_bigtiff,
            "Parsed TIFF planes"
        );

        Ok(Self { header, planes })
    }

    /// Follow the next-IFD chain from the first IFD.
    async fn parse_all_ifds<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut ifds = Vec::new();
        let mut visited = HashSet::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 && ifds.len() < MAX_IFDS {
            if !visited.insert(offset) {
                return Err(TiffError::InvalidIfdOffset(offset));
            }

            let count_bytes = reader.read_exact_at(offset, header.count_len()).await?;
            let entry_count = header.read_count(&count_bytes);

            let ifd_size =
                Ifd::calculate_size(entry_count, header).ok_or(TiffError::FileTooSmall {
                    required: u64::MAX,
                    actual: reader.size(),
                })?;
            let ifd_bytes = reader.read_exact_at(offset, ifd_size).await?;
            let ifd = Ifd::parse(&ifd_bytes, header)?;

            offset = ifd.next_ifd_offset;
            ifds.push(ifd);
        }

        Ok(ifds)
    }

    /// Width and height shared by all planes.
    pub fn dimensions(&self) -> (u32, u32) {
        self.planes
            .first()
            .map(|p| (p.width, p.height))
            .unwrap_or((0, 0))
    }

    pub fn pixel_type(&self) -> Option<PixelType> {
        self.planes.first().map(|p| p.pixel_type)
    }
}
