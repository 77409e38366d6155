//! Cheap format recognition from the file header.

use crate::error::IoError;
use crate::io::RangeReader;

use super::tiff::{ByteOrder, TIFF_HEADER_SIZE};

/// Check if bytes start with a TIFF or BigTIFF header.
///
/// Only the byte order mark and the version are checked; the IFD offset is
/// validated when the file is actually opened.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    if bytes.len() < TIFF_HEADER_SIZE {
        return false;
    }

    ByteOrder::from_mark(&bytes[0..2])
        .map(|byte_order| byte_order.read_u16(&bytes[2..4]))
        .is_some_and(|version| version == 42 || version == 43)
}

/// Check whether a file looks like a TIFF by reading its first bytes.
pub async fn probe_tiff<R: RangeReader>(reader: &R) -> Result<bool, IoError> {
    if reader.size() < TIFF_HEADER_SIZE as u64 {
        return Ok(false);
    }
    let bytes = reader.read_exact_at(0, TIFF_HEADER_SIZE).await?;
    Ok(is_tiff_header(&bytes))
}
