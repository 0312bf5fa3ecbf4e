//! Fallback transfer: walk the tree over the file-transfer subsystem.

use std::sync::Arc;

use tracing::trace;
use wpzip_core::{RemoteEntryKind, RemoteError, RemoteFileReader};

use super::{EmitterStrategy, FileCallback, FileEmitter, directory_root, split_parent};
use crate::error::{PackagerError, PackagerResult};

/// Emits files one at a time by listing directories and opening each file.
pub struct SftpEmitter {
    reader: Arc<dyn RemoteFileReader>,
}

impl SftpEmitter {
    /// Emitter that lists and opens through `reader`.
    #[must_use]
    pub fn new(reader: Arc<dyn RemoteFileReader>) -> Self {
        Self { reader }
    }

    fn walk(
        &self,
        root: &str,
        relative: &str,
        callback: &mut FileCallback<'_>,
    ) -> PackagerResult<()> {
        let directory = format!("{root}{relative}");
        let entries = self
            .reader
            .read_dir(&directory)
            .map_err(|source| PackagerError::remote("emit.read_dir", &directory, source))?;

        for entry in entries {
            if entry.name == "." || entry.name == ".." {
                continue;
            }
            let child = format!("{relative}{}", entry.name);
            match entry.kind {
                RemoteEntryKind::Directory => self.walk(root, &format!("{child}/"), callback)?,
                RemoteEntryKind::File => {
                    let path = format!("{root}{child}");
                    trace!(%path, "opening remote file");
                    let mut stream = self
                        .reader
                        .open(&path)
                        .map_err(|source| PackagerError::remote("emit.open", &path, source))?;
                    callback(&child, &mut stream)?;
                }
                RemoteEntryKind::Symlink | RemoteEntryKind::Other => {}
            }
        }
        Ok(())
    }
}

impl FileEmitter for SftpEmitter {
    fn strategy(&self) -> EmitterStrategy {
        EmitterStrategy::PerFile
    }

    fn estimate_size(&self, _root: &str) -> Option<u64> {
        None
    }

    fn emit_all(&self, root: &str, callback: &mut FileCallback<'_>) -> PackagerResult<()> {
        self.walk(&directory_root(root), "", callback)
    }

    fn emit_single(&self, path: &str, callback: &mut FileCallback<'_>) -> PackagerResult<()> {
        let (_, name) = split_parent(path);
        let mut stream = match self.reader.open(path) {
            Ok(stream) => stream,
            Err(RemoteError::NotFound { .. }) => {
                return Err(PackagerError::NotFound {
                    path: path.to_string(),
                });
            }
            Err(source) => return Err(PackagerError::remote("emit.open", path, source)),
        };
        callback(&name, &mut stream)
    }
}
