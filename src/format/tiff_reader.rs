use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use super::detect::probe_tiff;
use super::stack::PlaneStack;
use crate::error::{FormatError, MetadataError};
use crate::io::{LocalRangeReader, RangeReader};
use crate::metadata::{Element, MetadataDocument, ROOT_ELEMENT};
use crate::reader::{FileGrouper, ImageReader, MetadataSource, PlaneReader, SeriesReader};

/// A TIFF file that has been opened with [`FileGrouper::set_id`].
struct OpenTiff {
    name: String,
    reader: LocalRangeReader,
    stack: PlaneStack,
}

/// Reader for uncompressed, single-sample TIFF and BigTIFF stacks.
///
/// Each file is one dataset with a single series; every IFD is a Z plane.
/// Names are resolved through [`map_id`](FileGrouper::map_id) and fall back
/// to being used as paths directly.
#[derive(Default)]
pub struct TiffImageReader {
    paths: HashMap<String, String>,
    open: Option<OpenTiff>,
}

impl TiffImageReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve(&self, name: &str) -> String {
        self.paths
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    fn current(&self) -> Result<&OpenTiff, FormatError> {
        self.open.as_ref().ok_or(FormatError::NoFileOpen)
    }

    fn plane_count(&self) -> usize {
        self.open.as_ref().map_or(0, |open| open.stack.planes.len())
    }
}

#[async_trait]
impl FileGrouper for TiffImageReader {
    fn map_id(&mut self, name: &str, path: &str) {
        self.paths.insert(name.to_string(), path.to_string());
    }

    fn mapped_path(&self, name: &str) -> Option<&str> {
        self.paths.get(name).map(String::as_str)
    }

    async fn is_recognized_format(&mut self, name: &str) -> bool {
        let path = self.resolve(name);
        match LocalRangeReader::open(&path).await {
            Ok(reader) => probe_tiff(&reader).await.unwrap_or(false),
            Err(e) => {
                debug!(name, error = %e, "Cannot probe file");
                false
            }
        }
    }

    async fn set_id(&mut self, name: &str) -> Result<(), FormatError> {
        if self.open.as_ref().is_some_and(|open| open.name == name) {
            return Ok(());
        }
        self.open = None;

        let path = self.resolve(name);
        let reader = LocalRangeReader::open(&path).await?;
        if !probe_tiff(&reader).await? {
            return Err(FormatError::UnsupportedFormat {
                reason: format!("{} is not a TIFF file", path),
            });
        }
        let stack = PlaneStack::parse(&reader).await?;

        info!(
            name,
            path = %reader.path().display(),
            planes = stack.planes.len(),
            "Opened TIFF"
        );

        self.open = Some(OpenTiff {
            name: name.to_string(),
            reader,
            stack,
        });
        Ok(())
    }

    fn used_files(&self) -> Option<Vec<Option<String>>> {
        self.open.as_ref().map(|open| vec![Some(open.name.clone())])
    }
}

impl SeriesReader for TiffImageReader {
    fn series_count(&self) -> usize {
        usize::from(self.open.is_some())
    }

    fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        let count = self.series_count();
        if series >= count {
            return Err(FormatError::SeriesOutOfRange { series, count });
        }
        Ok(())
    }

    fn size_x(&self) -> u32 {
        self.open.as_ref().map_or(0, |open| open.stack.dimensions().0)
    }

    fn size_y(&self) -> u32 {
        self.open.as_ref().map_or(0, |open| open.stack.dimensions().1)
    }

    fn size_z(&self) -> u32 {
        self.plane_count() as u32
    }

    fn size_c(&self) -> u32 {
        u32::from(self.open.is_some())
    }

    fn size_t(&self) -> u32 {
        u32::from(self.open.is_some())
    }

    fn pixel_type(&self) -> i32 {
        self.open
            .as_ref()
            .and_then(|open| open.stack.pixel_type())
            .map_or(-1, |pixel_type| pixel_type.code())
    }

    fn is_little_endian(&self) -> bool {
        self.open
            .as_ref()
            .map_or(true, |open| open.stack.header.byte_order.is_little_endian())
    }

    fn image_count(&self) -> usize {
        self.plane_count()
    }

    fn index(&self, z: u32, c: u32, t: u32) -> Result<usize, FormatError> {
        self.current()?;
        let (size_z, size_c, size_t) = (self.size_z(), self.size_c(), self.size_t());
        if z >= size_z || c >= size_c || t >= size_t {
            return Err(FormatError::PlaneOutOfRange {
                what: format!("(z={}, c={}, t={})", z, c, t),
                count: self.plane_count(),
            });
        }
        Ok((z + size_z * (c + size_c * t)) as usize)
    }
}

#[async_trait]
impl PlaneReader for TiffImageReader {
    async fn open_bytes(&mut self, index: usize) -> Result<Bytes, FormatError> {
        let open = self.current()?;
        let plane = open
            .stack
            .planes
            .get(index)
            .ok_or_else(|| FormatError::PlaneOutOfRange {
                what: format!("#{}", index),
                count: open.stack.planes.len(),
            })?;
        Ok(plane.read(&open.reader).await?)
    }
}

impl MetadataSource for TiffImageReader {
    fn metadata_document(&self) -> Result<MetadataDocument, MetadataError> {
        let open = self
            .open
            .as_ref()
            .ok_or_else(|| MetadataError::Malformed("no file open".to_string()))?;
        Ok(build_document(&open.name, &open.stack))
    }
}

#[async_trait]
impl ImageReader for TiffImageReader {
    async fn close(&mut self) -> Result<(), FormatError> {
        if let Some(open) = self.open.take() {
            debug!(file = open.reader.identifier(), "Closed TIFF");
        }
        Ok(())
    }
}

/// Describe a plane stack as an OME 2003-FC document with one image.
fn build_document(name: &str, stack: &PlaneStack) -> MetadataDocument {
    let (width, height) = stack.dimensions();
    let pixel_type = stack.pixel_type().map_or("", |pixel_type| pixel_type.as_str());
    let big_endian = !stack.header.byte_order.is_little_endian();
    let display_name = Path::new(name)
        .file_name()
        .map_or_else(|| name.to_string(), |n| n.to_string_lossy().into_owned());

    let pixels = Element::new("Pixels")
        .with_attribute("ID", "Pixels:0")
        .with_attribute("DimensionOrder", "XYZCT")
        .with_attribute("PixelType", pixel_type)
        .with_attribute("BigEndian", big_endian.to_string())
        .with_attribute("SizeX", width.to_string())
        .with_attribute("SizeY", height.to_string())
        .with_attribute("SizeZ", stack.planes.len().to_string())
        .with_attribute("SizeC", "1")
        .with_attribute("SizeT", "1");

    let image = Element::new("Image")
        .with_attribute("ID", "Image:0")
        .with_attribute("Name", display_name)
        .with_attribute("DefaultPixels", "Pixels:0")
        .with_child(Element::new("CustomAttributes").with_child(pixels));

    MetadataDocument::new(Element::new(ROOT_ELEMENT).with_child(image))
}
