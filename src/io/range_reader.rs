use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Random access to the bytes of an image file.
///
/// Plane data is fetched strip by strip, so a reader only ever holds the
/// header, the IFDs and one plane in memory.
#[async_trait]
pub trait RangeReader: Send + Sync {
    /// `len` bytes starting at `offset`; a range past the end is an error.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    fn size(&self) -> u64;

    /// Name used in logs and error messages.
    fn identifier(&self) -> &str;
}

// Fixed-width integer decoding. All helpers panic if `bytes` is shorter
// than the integer.

#[inline]
fn prefix<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[..N]);
    buf
}

#[inline]
pub fn read_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes(prefix(bytes))
}

#[inline]
pub fn read_u16_be(bytes: &[u8]) -> u16 {
    u16::from_be_bytes(prefix(bytes))
}

#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(prefix(bytes))
}

#[inline]
pub fn read_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes(prefix(bytes))
}

#[inline]
pub fn read_u64_le(bytes: &[u8]) -> u64 {
    u64::from_le_bytes(prefix(bytes))
}

#[inline]
pub fn read_u64_be(bytes: &[u8]) -> u64 {
    u64::from_be_bytes(prefix(bytes))
}
