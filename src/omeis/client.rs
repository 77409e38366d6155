use std::collections::HashMap;

use tracing::{debug, warn};

use super::transport::OmeisTransport;
use crate::error::OmeisError;

/// Pixel buffer dimensions and sample layout for `NewPixels`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelsLayout {
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    pub size_c: u32,
    pub size_t: u32,
    pub bytes_per_pixel: u32,
    pub is_signed: bool,
    pub is_float: bool,
}

impl PixelsLayout {
    /// The `Dims=... IsSigned=... IsFloat=...` parameter string.
    pub fn to_params(&self) -> String {
        format!(
            "Dims={},{},{},{},{},{} IsSigned={} IsFloat={}",
            self.size_x,
            self.size_y,
            self.size_z,
            self.size_c,
            self.size_t,
            self.bytes_per_pixel,
            u8::from(self.is_signed),
            u8::from(self.is_float),
        )
    }
}

/// Typed OMEIS method calls on top of a [`OmeisTransport`].
///
/// Single-value methods take the first response line and log any extra
/// lines. No call is retried.
pub struct OmeisClient<T: OmeisTransport> {
    transport: T,
}

impl<T: OmeisTransport> OmeisClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Local path of the original file with the given ID.
    pub async fn local_file_path(&self, file_id: u64) -> Result<String, OmeisError> {
        let lines = self
            .transport
            .call("GetLocalPath", &format!("FileID={}", file_id))
            .await?;
        first_line("GetLocalPath", lines)
            .ok_or_else(|| OmeisError::NotFound(format!("local path for file ID {}", file_id)))
    }

    /// Local path of the pixels file with the given ID.
    pub async fn local_pixels_path(&self, pixels_id: u64) -> Result<String, OmeisError> {
        let lines = self
            .transport
            .call("GetLocalPath", &format!("PixelsID={}", pixels_id))
            .await?;
        first_line("GetLocalPath", lines).ok_or_else(|| {
            OmeisError::NotFound(format!("local path for pixels ID {}", pixels_id))
        })
    }

    /// `key=value` pairs describing a file, split on the first `=`.
    pub async fn file_info(&self, file_id: u64) -> Result<HashMap<String, String>, OmeisError> {
        let lines = self
            .transport
            .call("FileInfo", &format!("FileID={}", file_id))
            .await?;

        let mut info = HashMap::new();
        for line in lines {
            match line.split_once('=') {
                Some((key, value)) => {
                    info.insert(key.to_string(), value.to_string());
                }
                None => warn!("Ignoring extraneous line in OMEIS FileInfo call: {}", line),
            }
        }
        Ok(info)
    }

    /// Whether OMEIS stores pixels little-endian.
    pub async fn native_byte_order(&self) -> Result<bool, OmeisError> {
        const METHOD: &str = "GetNativeEndian";
        let lines = self.transport.call(METHOD, "").await?;
        let value = first_line(METHOD, lines)
            .ok_or_else(|| protocol_error(METHOD, "no endianness value returned"))?;

        if value.eq_ignore_ascii_case("little") {
            Ok(true)
        } else if value.eq_ignore_ascii_case("big") {
            Ok(false)
        } else {
            Err(protocol_error(
                METHOD,
                format!("invalid endianness value: {}", value),
            ))
        }
    }

    /// Allocate a new pixels buffer and return its ID.
    pub async fn new_pixels(&self, layout: &PixelsLayout) -> Result<u64, OmeisError> {
        const METHOD: &str = "NewPixels";
        let lines = self.transport.call(METHOD, &layout.to_params()).await?;
        let pixels_id = parse_pixels_id(METHOD, lines)?;
        debug!(pixels_id, "Allocated OMEIS pixels");
        Ok(pixels_id)
    }

    /// Finalize a pixels buffer. OMEIS may return a different ID.
    pub async fn finish_pixels(&self, pixels_id: u64) -> Result<u64, OmeisError> {
        const METHOD: &str = "FinishPixels";
        let lines = self
            .transport
            .call(METHOD, &format!("PixelsID={}", pixels_id))
            .await?;
        parse_pixels_id(METHOD, lines)
    }

    /// SHA1 digest of a finished pixels buffer.
    pub async fn pixels_sha1(&self, pixels_id: u64) -> Result<String, OmeisError> {
        const METHOD: &str = "PixelsSHA1";
        let lines = self
            .transport
            .call(METHOD, &format!("PixelsID={}", pixels_id))
            .await?;
        first_line(METHOD, lines).ok_or_else(|| {
            protocol_error(METHOD, format!("no SHA1 returned for pixels ID {}", pixels_id))
        })
    }
}

fn protocol_error(method: &str, message: impl Into<String>) -> OmeisError {
    OmeisError::Protocol {
        method: method.to_string(),
        message: message.into(),
    }
}

fn first_line(method: &str, mut lines: Vec<String>) -> Option<String> {
    if lines.len() > 1 {
        warn!(
            "Ignoring {} extraneous lines in OMEIS {} call output",
            lines.len() - 1,
            method
        );
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.swap_remove(0))
    }
}

/// Pixels IDs are positive 32-bit integers.
fn parse_pixels_id(method: &str, lines: Vec<String>) -> Result<u64, OmeisError> {
    let token = first_line(method, lines)
        .ok_or_else(|| protocol_error(method, "no pixels ID returned"))?;
    token
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .map(|id| id as u64)
        .ok_or_else(|| protocol_error(method, format!("invalid pixels ID: {}", token)))
}
