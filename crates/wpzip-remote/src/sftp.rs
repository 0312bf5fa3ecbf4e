//! File-transfer trait implementations over the session's SFTP subsystem.

use std::io::{self, Read};

use tokio::io::AsyncWriteExt;
use tokio_util::io::SyncIoBridge;
use tracing::debug;
use wpzip_core::{
    FileUploadDeleter, RemoteDirEntry, RemoteEntryKind, RemoteError, RemoteFileReader,
    RemoteResult, RemoteStream,
};

use crate::error;
use crate::ssh::SshSession;

const UPLOAD_CHUNK: usize = 32 * 1024;

impl RemoteFileReader for SshSession {
    fn read_dir(&self, path: &str) -> RemoteResult<Vec<RemoteDirEntry>> {
        let listing = self
            .runtime
            .block_on(self.sftp.read_dir(path))
            .map_err(|err| error::sftp("sftp.read_dir", path, err))?;

        Ok(listing
            .filter(|entry| !matches!(entry.file_name().as_str(), "." | ".."))
            .map(|entry| {
                let file_type = entry.file_type();
                let kind = if file_type.is_dir() {
                    RemoteEntryKind::Directory
                } else if file_type.is_symlink() {
                    RemoteEntryKind::Symlink
                } else if file_type.is_file() {
                    RemoteEntryKind::File
                } else {
                    RemoteEntryKind::Other
                };
                RemoteDirEntry {
                    name: entry.file_name(),
                    kind,
                }
            })
            .collect())
    }

    fn open(&self, path: &str) -> RemoteResult<RemoteStream> {
        let file = self
            .runtime
            .block_on(self.sftp.open(path))
            .map_err(|err| error::sftp("sftp.open", path, err))?;
        Ok(Box::new(SyncIoBridge::new_with_handle(
            Box::pin(file),
            self.runtime.clone(),
        )))
    }
}

impl FileUploadDeleter for SshSession {
    fn upload(&self, contents: &mut dyn Read, destination: &str) -> RemoteResult<()> {
        let mut file = self
            .runtime
            .block_on(self.sftp.create(destination))
            .map_err(|err| error::sftp("sftp.create", destination, err))?;

        let mut buffer = vec![0_u8; UPLOAD_CHUNK];
        let mut written = 0_u64;
        loop {
            let read = match contents.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(RemoteError::io("sftp.upload_read", destination, err)),
            };
            self.runtime
                .block_on(file.write_all(&buffer[..read]))
                .map_err(|err| RemoteError::io("sftp.upload_write", destination, err))?;
            written += read as u64;
        }
        self.runtime
            .block_on(file.shutdown())
            .map_err(|err| RemoteError::io("sftp.upload_close", destination, err))?;
        debug!(%destination, bytes = written, "uploaded scratch file");
        Ok(())
    }

    fn delete(&self, path: &str) -> RemoteResult<()> {
        let removed = self.runtime.block_on(self.sftp.remove_file(path));
        match removed {
            Ok(()) => Ok(()),
            Err(file_err) => {
                let is_dir = self
                    .runtime
                    .block_on(self.sftp.metadata(path))
                    .is_ok_and(|metadata| metadata.is_dir());
                if !is_dir {
                    return Err(error::sftp("sftp.remove_file", path, file_err));
                }
                self.runtime
                    .block_on(self.sftp.remove_dir(path))
                    .map_err(|err| error::sftp("sftp.remove_dir", path, err))
            }
        }
    }

    fn mkdir(&self, path: &str) -> RemoteResult<()> {
        self.runtime
            .block_on(self.sftp.create_dir(path))
            .map_err(|err| error::sftp("sftp.mkdir", path, err))
    }
}
