//! The importer: ties group resolution, transcoding and metadata together.
//!
//! ```text
//!  file IDs ──► FileGroupResolver ──► PixelTranscoder ──► MetadataStore
//!                  │        │             │       │            │
//!                  ▼        ▼             ▼       ▼            ▼
//!               OMEIS    reader        reader   OMEIS       OME-XML
//!            (FileInfo, (set_id,     (planes) (NewPixels,
//!           GetLocalPath) used_files)          FinishPixels, PixelsSHA1)
//! ```

use tracing::{info, warn};

use super::group::{DiscoveredGroup, FileGroupResolver};
use super::transcode::{PixelTranscoder, SeriesResult};
use crate::error::{ImportError, MetadataError};
use crate::metadata::{generate_identity, MetadataStore};
use crate::omeis::{OmeisClient, OmeisTransport};
use crate::reader::ImageReader;

/// Result of a successful import.
#[derive(Debug)]
pub struct ImportOutcome {
    /// Metadata with OMEIS pixels IDs and digests filled in
    pub store: MetadataStore,
    pub series: Vec<SeriesResult>,
}

impl ImportOutcome {
    /// Serialize the metadata document.
    pub fn into_xml(mut self) -> Result<String, ImportError> {
        let xml = self
            .store
            .dump_xml()?
            .ok_or_else(|| MetadataError::Malformed("no metadata document".to_string()))?;
        Ok(xml)
    }
}

/// Imports OMEIS files through an [`ImageReader`].
pub struct Importer<R: ImageReader, T: OmeisTransport> {
    reader: R,
    client: OmeisClient<T>,
}

impl<R: ImageReader, T: OmeisTransport> Importer<R, T> {
    pub fn new(reader: R, client: OmeisClient<T>) -> Self {
        Self { reader, client }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn client(&self) -> &OmeisClient<T> {
        &self.client
    }

    /// Import `file_ids` as a single dataset.
    ///
    /// The IDs must be exactly the files the reader groups together. Each
    /// series becomes one OMEIS pixels buffer.
    pub async fn import_ids(&mut self, file_ids: &[u64]) -> Result<ImportOutcome, ImportError> {
        let result = self.import_group(file_ids).await;
        self.close_reader(result).await
    }

    /// Report how the reader would group `file_ids`, without importing.
    pub async fn test_ids(&mut self, file_ids: &[u64]) -> Result<Vec<DiscoveredGroup>, ImportError> {
        let result = FileGroupResolver::new(&mut self.reader, &self.client)
            .discover(file_ids)
            .await;
        self.close_reader(result).await
    }

    async fn import_group(&mut self, file_ids: &[u64]) -> Result<ImportOutcome, ImportError> {
        let local_little_endian = self.client.native_byte_order().await?;
        info!(
            ids = ?file_ids,
            omeis = self.client.transport().endpoint(),
            little_endian = local_little_endian,
            "Importing files"
        );

        let group = FileGroupResolver::new(&mut self.reader, &self.client)
            .resolve(file_ids)
            .await?;

        let mut document = self.reader.metadata_document()?;
        if document.identity().is_none() {
            document.set_identity(generate_identity());
        }

        let series = PixelTranscoder::new(&mut self.reader, &self.client)
            .transcode(&group, local_little_endian, &mut document)
            .await?;

        info!(
            name = group.primary_name(),
            ids = ?group.ids(),
            series = series.len(),
            "Import complete"
        );
        Ok(ImportOutcome {
            store: MetadataStore::from_document(document),
            series,
        })
    }

    /// Close the reader, keeping the first error.
    async fn close_reader<V>(
        &mut self,
        result: Result<V, ImportError>,
    ) -> Result<V, ImportError> {
        let closed = self.reader.close().await;
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_error)) => {
                warn!(error = %close_error, "Failed to close reader after error");
                Err(e)
            }
        }
    }
}
