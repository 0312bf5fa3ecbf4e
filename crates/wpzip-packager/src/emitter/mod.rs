//! Streaming directory emitters.
//!
//! # Design
//! - An emitter hands each remote regular file to a callback as
//!   `(relative path, reader)` and never stages contents locally.
//! - Exactly one file is in flight at a time; the callback must drain or drop
//!   the reader before the next file is produced.
//! - The strategy is chosen once by [`new_file_emitter`] from a capability probe.

use std::io::Read;
use std::sync::Arc;

use tracing::info;
use wpzip_core::{RemoteCommandRunner, RemoteFileReader};

use crate::error::PackagerResult;

mod sftp;
mod tar_stream;

pub use self::sftp::SftpEmitter;
pub use self::tar_stream::TarEmitter;

/// Command whose success selects the tar-stream strategy.
pub const TAR_PROBE: &str = "tar --version";

/// Receives one emitted file at a time.
pub type FileCallback<'a> = dyn FnMut(&str, &mut dyn Read) -> PackagerResult<()> + 'a;

/// Transfer strategy behind a [`FileEmitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterStrategy {
    /// One remote `tar` process streamed through a local decoder.
    TarStream,
    /// One file-transfer open per file, walked depth-first.
    PerFile,
}

/// Streams remote files to a callback.
pub trait FileEmitter: Send + Sync {
    /// Strategy this emitter implements.
    fn strategy(&self) -> EmitterStrategy;

    /// Best-effort byte size of `root`, used for progress reporting.
    fn estimate_size(&self, root: &str) -> Option<u64>;

    /// Emit every regular file under `root` with a path relative to `root`.
    ///
    /// # Errors
    ///
    /// Any listing, open, read, or decode failure aborts the whole emission,
    /// as does an error returned by `callback`.
    fn emit_all(&self, root: &str, callback: &mut FileCallback<'_>) -> PackagerResult<()>;

    /// Emit the single file at `path` under its base name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PackagerError::NotFound`] when nothing was emitted.
    fn emit_single(&self, path: &str, callback: &mut FileCallback<'_>) -> PackagerResult<()>;
}

/// Pick the tar-stream emitter when the remote host can run `tar`, the
/// per-file emitter otherwise.
#[must_use]
pub fn new_file_emitter(
    probe: Arc<dyn RemoteCommandRunner>,
    reader: Arc<dyn RemoteFileReader>,
) -> Arc<dyn FileEmitter> {
    if probe.can_run(TAR_PROBE) {
        info!("remote tar available; streaming files as a single archive");
        Arc::new(TarEmitter::new(probe))
    } else {
        info!("remote tar unavailable; transferring files one at a time");
        Arc::new(SftpEmitter::new(reader))
    }
}

/// `path` with exactly one trailing separator.
pub(crate) fn directory_root(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    format!("{trimmed}/")
}

/// Split a file path into its parent directory and base name.
pub(crate) fn split_parent(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some(("", name)) => ("/".to_string(), name.to_string()),
        Some((parent, name)) => (parent.to_string(), name.to_string()),
        None => (".".to_string(), trimmed.to_string()),
    }
}
