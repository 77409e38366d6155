//! Streaming series planes into OMEIS pixel buffers.

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

use super::group::FileGroup;
use crate::error::{FormatError, ImportError};
use crate::metadata::{Element, MetadataDocument};
use crate::omeis::{OmeisClient, OmeisTransport, PixelsLayout};
use crate::reader::{PixelType, PlaneReader};

/// Plane order OMEIS expects: Z fastest, then C, then T.
pub const DIMENSION_ORDER: &str = "XYZCT";

/// Outcome of one transcoded series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesResult {
    pub series: usize,
    /// Final pixels ID, after `FinishPixels`
    pub pixels_id: u64,
    pub sha1: String,
}

/// Whether samples must be byte-swapped before they are written.
///
/// Floating point samples are never swapped.
pub fn needs_swap(local_little_endian: bool, reader_little_endian: bool, pixel_type: PixelType) -> bool {
    local_little_endian != reader_little_endian
        && pixel_type.bytes_per_pixel() > 1
        && !pixel_type.is_float()
}

/// Reverse the bytes of every `bytes_per_pixel`-sized sample in place.
///
/// A trailing partial sample is left untouched.
pub fn swap_sample_bytes(plane: &mut [u8], bytes_per_pixel: usize) {
    if bytes_per_pixel < 2 {
        return;
    }
    for sample in plane.chunks_exact_mut(bytes_per_pixel) {
        sample.reverse();
    }
}

/// (z, c, t) coordinates with T outermost and Z innermost.
pub fn canonical_plane_order(
    size_z: u32,
    size_c: u32,
    size_t: u32,
) -> impl Iterator<Item = (u32, u32, u32)> {
    (0..size_t).flat_map(move |t| {
        (0..size_c).flat_map(move |c| (0..size_z).map(move |z| (z, c, t)))
    })
}

/// Upper-case a leading `u` of a pixel type token (`uint8` to `Uint8`).
pub fn canonical_pixel_type(pixel_type: &str) -> Option<String> {
    pixel_type
        .strip_prefix('u')
        .map(|rest| format!("U{}", rest))
}

/// Record a finished series on its `Pixels` element.
pub fn apply_series_result(pixels: &mut Element, result: &SeriesResult) {
    pixels.set_attribute("FileSHA1", result.sha1.as_str());
    pixels.set_attribute("ImageServerID", result.pixels_id.to_string());
    pixels.set_attribute("DimensionOrder", DIMENSION_ORDER);
    if let Some(canonical) = pixels.attribute("PixelType").and_then(canonical_pixel_type) {
        pixels.set_attribute("PixelType", canonical);
    }
}

fn sink_error(path: &str, source: std::io::Error) -> ImportError {
    ImportError::Sink {
        path: path.to_string(),
        source,
    }
}

/// Copies every series of an open dataset into OMEIS.
pub struct PixelTranscoder<'a, R, T: OmeisTransport> {
    reader: &'a mut R,
    client: &'a OmeisClient<T>,
}

impl<'a, R: PlaneReader, T: OmeisTransport> PixelTranscoder<'a, R, T> {
    pub fn new(reader: &'a mut R, client: &'a OmeisClient<T>) -> Self {
        Self { reader, client }
    }

    /// Transcode all series and record the results in `document`.
    ///
    /// `document` must hold one `Pixels` element per series, in series
    /// order; the check runs before anything is allocated. Pixels already
    /// finished in OMEIS are not removed if a later series fails.
    pub async fn transcode(
        &mut self,
        group: &FileGroup,
        local_little_endian: bool,
        document: &mut MetadataDocument,
    ) -> Result<Vec<SeriesResult>, ImportError> {
        let series_count = self.reader.series_count();
        let found = document.pixels_count();
        if found != series_count {
            return Err(FormatError::PixelsCountMismatch {
                id: group.primary_name().to_string(),
                found,
                expected: series_count,
            }
            .into());
        }
        debug!(series_count, "Series detected");

        let mut results: Vec<SeriesResult> = Vec::with_capacity(series_count);
        for (series, pixels) in document.pixels_elements_mut().into_iter().enumerate() {
            let result = match self.transcode_series(group, series, local_little_endian).await {
                Ok(result) => result,
                Err(e) => {
                    if !results.is_empty() {
                        let committed: Vec<u64> = results.iter().map(|r| r.pixels_id).collect();
                        warn!(?committed, "Import failed; finished OMEIS pixels are left in place");
                    }
                    return Err(e);
                }
            };

            apply_series_result(pixels, &result);
            results.push(result);
        }

        Ok(results)
    }

    async fn transcode_series(
        &mut self,
        group: &FileGroup,
        series: usize,
        local_little_endian: bool,
    ) -> Result<SeriesResult, ImportError> {
        self.reader.set_series(series)?;

        let code = self.reader.pixel_type();
        let pixel_type = PixelType::try_from(code).map_err(|code| FormatError::UnknownPixelType {
            id: group.primary_name().to_string(),
            series,
            code,
        })?;

        let layout = PixelsLayout {
            size_x: self.reader.size_x(),
            size_y: self.reader.size_y(),
            size_z: self.reader.size_z(),
            size_c: self.reader.size_c(),
            size_t: self.reader.size_t(),
            bytes_per_pixel: pixel_type.bytes_per_pixel(),
            is_signed: pixel_type.is_signed(),
            is_float: pixel_type.is_float(),
        };
        let swap = needs_swap(
            local_little_endian,
            self.reader.is_little_endian(),
            pixel_type,
        );

        let pixels_id = self.client.new_pixels(&layout).await?;
        let pixels_path = self.client.local_pixels_path(pixels_id).await?;
        debug!(series, pixels_id, path = %pixels_path, swap, "Writing series");

        self.write_planes(&pixels_path, &layout, swap).await?;

        let pixels_id = self.client.finish_pixels(pixels_id).await?;
        let sha1 = self.client.pixels_sha1(pixels_id).await?;
        info!(series, pixels_id, %sha1, "Series imported");

        Ok(SeriesResult {
            series,
            pixels_id,
            sha1,
        })
    }

    async fn write_planes(
        &mut self,
        path: &str,
        layout: &PixelsLayout,
        swap: bool,
    ) -> Result<(), ImportError> {
        let plane_count = (layout.size_z as usize)
            .saturating_mul(layout.size_c as usize)
            .saturating_mul(layout.size_t as usize);
        let image_count = self.reader.image_count();
        if image_count != plane_count {
            debug!(
                image_count,
                plane_count, "Reader image count differs from sizeZ*sizeC*sizeT"
            );
        }

        let file = File::create(path).await.map_err(|e| sink_error(path, e))?;
        let mut sink = BufWriter::new(file);
        let bytes_per_pixel = layout.bytes_per_pixel as usize;

        for (z, c, t) in canonical_plane_order(layout.size_z, layout.size_c, layout.size_t) {
            let index = self.reader.index(z, c, t)?;
            trace!(index, z, c, t, "Reading plane");
            let plane = self.reader.open_bytes(index).await?;

            let written = if swap {
                let mut swapped = plane.to_vec();
                swap_sample_bytes(&mut swapped, bytes_per_pixel);
                sink.write_all(&swapped).await
            } else {
                sink.write_all(&plane).await
            };
            written.map_err(|e| sink_error(path, e))?;
        }

        sink.flush().await.map_err(|e| sink_error(path, e))?;
        Ok(())
    }
}
