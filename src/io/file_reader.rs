use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

use super::RangeReader;
use crate::error::IoError;

/// Local-file implementation of RangeReader.
///
/// OMEIS hands out local paths for every uploaded file, so the importer reads
/// originals straight from disk. The file size is taken once on open.
pub struct LocalRangeReader {
    file: Mutex<File>,
    path: PathBuf,
    size: u64,
    identifier: String,
}

impl LocalRangeReader {
    /// Open the file at `path`.
    ///
    /// Returns `IoError::NotFound` if the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref().to_path_buf();
        let identifier = path.display().to_string();

        let file = File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IoError::NotFound(identifier.clone())
            } else {
                IoError::Local {
                    path: identifier.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let size = file
            .metadata()
            .await
            .map_err(|e| IoError::Local {
                path: identifier.clone(),
                message: e.to_string(),
            })?
            .len();

        Ok(Self {
            file: Mutex::new(file),
            path,
            size,
            identifier,
        })
    }

    /// Get the path this reader was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn local_error(&self, err: std::io::Error) -> IoError {
        IoError::Local {
            path: self.identifier.clone(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl RangeReader for LocalRangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let end = offset.checked_add(len as u64);
        if end.map_or(true, |end| end > self.size) {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            });
        }

        if len == 0 {
            return Ok(Bytes::new());
        }

        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| self.local_error(e))?;

        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)
            .await
            .map_err(|e| self.local_error(e))?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
