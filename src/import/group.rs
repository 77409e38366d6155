//! Mapping OMEIS file IDs onto reader file groups.

use tracing::{debug, warn};

use crate::error::{FormatError, ImportError, OmeisError};
use crate::omeis::{OmeisClient, OmeisTransport};
use crate::reader::FileGrouper;

/// `FileInfo` key holding the original file name.
pub const NAME_KEY: &str = "Name";

/// One requested file after its OMEIS lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub id: u64,
    /// Original file name, if OMEIS reported one
    pub name: Option<String>,
    pub path: Option<String>,
}

/// Files validated to form exactly one reader dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    /// Requested files in ascending ID order
    pub files: Vec<ResolvedFile>,
    /// Names the reader reported as consumed
    pub used_files: Vec<String>,
}

impl FileGroup {
    /// Member IDs, ascending.
    pub fn ids(&self) -> Vec<u64> {
        self.files.iter().map(|f| f.id).collect()
    }

    /// Name the dataset was opened from (the lowest ID).
    pub fn primary_name(&self) -> &str {
        self.files
            .first()
            .and_then(|f| f.name.as_deref())
            .unwrap_or_default()
    }
}

/// A group found in discovery mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredGroup {
    /// Member IDs in the order they were matched
    pub ids: Vec<u64>,
}

impl DiscoveredGroup {
    /// Space-separated member IDs, as printed in discovery mode.
    pub fn to_line(&self) -> String {
        self.ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Resolves requested file IDs against the reader's idea of a dataset.
pub struct FileGroupResolver<'a, R, T: OmeisTransport> {
    reader: &'a mut R,
    client: &'a OmeisClient<T>,
}

impl<'a, R: FileGrouper, T: OmeisTransport> FileGroupResolver<'a, R, T> {
    pub fn new(reader: &'a mut R, client: &'a OmeisClient<T>) -> Self {
        Self { reader, client }
    }

    /// Look up name and local path of each ID and register them with the
    /// reader. IDs are processed in ascending order.
    ///
    /// With `require_name`, an ID whose file info lacks a name is an error;
    /// otherwise it is returned unnamed and not registered.
    async fn register(
        &mut self,
        file_ids: &[u64],
        require_name: bool,
    ) -> Result<Vec<ResolvedFile>, ImportError> {
        let mut ids = file_ids.to_vec();
        ids.sort_unstable();

        let mut files = Vec::with_capacity(ids.len());
        for id in ids {
            let mut info = self.client.file_info(id).await?;
            let name = info.remove(NAME_KEY);

            let Some(name) = name else {
                if require_name {
                    return Err(OmeisError::NotFound(format!("name of file ID {}", id)).into());
                }
                debug!(file_id = id, "File has no name, skipping");
                files.push(ResolvedFile {
                    id,
                    name: None,
                    path: None,
                });
                continue;
            };

            let path = self.client.local_file_path(id).await?;
            debug!(file_id = id, %name, %path, "Mapped file");
            self.reader.map_id(&name, &path);
            files.push(ResolvedFile {
                id,
                name: Some(name),
                path: Some(path),
            });
        }
        Ok(files)
    }

    /// Validate that `file_ids` are exactly the files of one dataset.
    ///
    /// The dataset is opened from the lowest ID. Its used files must match
    /// the requested names one to one, in any order.
    pub async fn resolve(&mut self, file_ids: &[u64]) -> Result<FileGroup, ImportError> {
        if file_ids.is_empty() {
            return Err(FormatError::NoFileIds.into());
        }

        let files = self.register(file_ids, true).await?;
        let names: Vec<&str> = files.iter().filter_map(|f| f.name.as_deref()).collect();

        let primary = names[0];
        let path = self
            .reader
            .mapped_path(primary)
            .unwrap_or(primary)
            .to_string();
        debug!(name = primary, %path, "Reading file group");

        self.reader.set_id(primary).await?;
        let used = self
            .reader
            .used_files()
            .ok_or_else(|| FormatError::InvalidFileList { path: path.clone() })?;

        if used.len() != names.len() {
            return Err(FormatError::FileListLengthMismatch {
                path,
                used: bracket_list(used.iter().map(|u| u.as_deref().unwrap_or("null"))),
                ids: bracket_list(names.iter().copied()),
            }
            .into());
        }

        let used: Vec<String> = match used.into_iter().collect::<Option<Vec<_>>>() {
            Some(used) => used,
            None => return Err(FormatError::FileListMismatch { path }.into()),
        };
        if !is_exact_match(&used, &names) {
            return Err(FormatError::FileListMismatch { path }.into());
        }

        Ok(FileGroup {
            files,
            used_files: used,
        })
    }

    /// Partition `file_ids` into the groups the reader would form.
    ///
    /// Unnamed and unrecognized files are left out. This never fails on
    /// grouping problems; they are logged instead.
    pub async fn discover(&mut self, file_ids: &[u64]) -> Result<Vec<DiscoveredGroup>, ImportError> {
        let files = self.register(file_ids, false).await?;
        let mut assigned = vec![false; files.len()];
        let mut groups = Vec::new();

        for i in 0..files.len() {
            if assigned[i] {
                continue;
            }
            let Some(name) = files[i].name.as_deref() else {
                continue;
            };
            if !self.reader.is_recognized_format(name).await {
                debug!(file_id = files[i].id, name, "Unrecognized format");
                continue;
            }
            self.reader.set_id(name).await?;
            let Some(used) = self.reader.used_files() else {
                continue;
            };

            let mut group = DiscoveredGroup { ids: Vec::new() };
            for (j, used_file) in used.iter().enumerate().rev() {
                let Some(used_file) = used_file else {
                    warn!(
                        "FileID {} ('{}') has null used file #{}",
                        files[i].id, name, j
                    );
                    continue;
                };

                let matched = (i..files.len())
                    .find(|&k| files[k].name.as_deref() == Some(used_file.as_str()));
                if let Some(k) = matched {
                    if assigned[k] {
                        warn!(
                            "FileID {} ('{}') already belongs to a group",
                            files[k].id, used_file
                        );
                    }
                    assigned[k] = true;
                    group.ids.push(files[k].id);
                }
            }
            groups.push(group);
        }

        Ok(groups)
    }
}

/// Whether `used` and `names` hold the same names with the same
/// multiplicities, ignoring order.
pub fn is_exact_match(used: &[String], names: &[&str]) -> bool {
    if used.len() != names.len() {
        return false;
    }
    let mut matched = vec![false; names.len()];
    used.iter().all(|u| {
        match (0..names.len()).find(|&j| !matched[j] && names[j] == u.as_str()) {
            Some(j) => {
                matched[j] = true;
                true
            }
            None => false,
        }
    })
}

/// Format names as `[a b c]`.
fn bracket_list<'s>(items: impl Iterator<Item = &'s str>) -> String {
    format!("[{}]", items.collect::<Vec<_>>().join(" "))
}
