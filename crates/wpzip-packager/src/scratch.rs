//! Guaranteed removal of scratch files uploaded to the remote webroot.
//!
//! # Design
//! - Every uploaded path is tracked before the upload is attempted, so a
//!   half-written file is still removed.
//! - Files are deleted before directories, each exactly once.
//! - A cleanup failure is surfaced even when the guarded work succeeded; when
//!   both fail the primary error rides along inside [`PackagerError::Cleanup`].
//! - Dropping an armed guard performs a best-effort cleanup.

use std::io::Read;
use std::sync::Arc;

use tracing::{debug, error, warn};
use wpzip_core::FileUploadDeleter;

use crate::error::{PackagerError, PackagerResult};

/// Tracks remote scratch files and directories for unconditional removal.
pub struct ScratchFiles {
    remote: Arc<dyn FileUploadDeleter>,
    files: Vec<String>,
    dirs: Vec<String>,
    armed: bool,
}

impl ScratchFiles {
    /// Empty guard deleting through `remote`.
    #[must_use]
    pub fn new(remote: Arc<dyn FileUploadDeleter>) -> Self {
        Self {
            remote,
            files: Vec::new(),
            dirs: Vec::new(),
            armed: true,
        }
    }

    /// Create `path` and track it for removal.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::UploadFailed`] when the directory cannot be created.
    pub fn mkdir(&mut self, path: &str) -> PackagerResult<()> {
        self.remote
            .mkdir(path)
            .map_err(|source| PackagerError::UploadFailed {
                path: path.to_string(),
                source,
            })?;
        self.dirs.push(path.to_string());
        Ok(())
    }

    /// Upload `contents` to `path`, tracking it first.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::UploadFailed`] when the upload fails.
    pub fn upload(&mut self, contents: &mut dyn Read, path: &str) -> PackagerResult<()> {
        self.files.push(path.to_string());
        debug!(%path, "uploading scratch file");
        self.remote
            .upload(contents, path)
            .map_err(|source| PackagerError::UploadFailed {
                path: path.to_string(),
                source,
            })
    }

    /// Paths in deletion order: files, then directories innermost first.
    fn tracked(&self) -> Vec<&str> {
        self.files
            .iter()
            .chain(self.dirs.iter().rev())
            .map(String::as_str)
            .collect()
    }

    /// Delete everything tracked and merge the result with `outcome`.
    ///
    /// # Errors
    ///
    /// Returns `outcome`'s error when cleanup succeeded, a
    /// [`PackagerError::Cleanup`] when cleanup failed (carrying `outcome`'s
    /// error as `primary` if there was one).
    pub fn finish<T>(mut self, outcome: PackagerResult<T>) -> PackagerResult<T> {
        match (outcome, self.cleanup()) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(primary), Ok(())) => Err(primary),
            (Ok(_), Err(cleanup)) => Err(cleanup),
            (Err(primary), Err(cleanup)) => {
                error!(
                    primary = %primary,
                    cleanup = %cleanup,
                    "scratch cleanup failed after an earlier failure"
                );
                Err(cleanup.with_primary(primary))
            }
        }
    }

    fn cleanup(&mut self) -> PackagerResult<()> {
        self.armed = false;
        let paths: Vec<String> = self.tracked().into_iter().map(str::to_string).collect();
        self.files.clear();
        self.dirs.clear();

        let mut first_failure = None;
        for path in &paths {
            match self.remote.delete(path) {
                Ok(()) => debug!(%path, "removed scratch file"),
                Err(err) if err.is_not_found() => debug!(%path, "scratch file already gone"),
                Err(source) => {
                    warn!(%path, error = %source, "could not remove scratch file");
                    if first_failure.is_none() {
                        first_failure = Some(PackagerError::Cleanup {
                            path: path.clone(),
                            source,
                            primary: None,
                        });
                    }
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

impl PackagerError {
    fn with_primary(self, primary: Self) -> Self {
        match self {
            Self::Cleanup { path, source, .. } => Self::Cleanup {
                path,
                source,
                primary: Some(Box::new(primary)),
            },
            other => other,
        }
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        if self.armed && (!self.files.is_empty() || !self.dirs.is_empty()) {
            warn!("scratch files dropped without explicit cleanup");
            if let Err(err) = self.cleanup() {
                warn!(error = %err, "best-effort scratch cleanup failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpzip_test_support::mocks::FakeRemoteHost;

    fn upload(scratch: &mut ScratchFiles, path: &str) -> PackagerResult<()> {
        scratch.upload(&mut "<?php".as_bytes(), path)
    }

    #[test]
    fn finish_deletes_files_then_directories_once() -> anyhow::Result<()> {
        let host = Arc::new(FakeRemoteHost::new());
        let mut scratch = ScratchFiles::new(host.clone());
        scratch.mkdir("/www/tmp")?;
        upload(&mut scratch, "/www/tmp/a.php")?;
        upload(&mut scratch, "/www/tmp/b.php")?;
        assert_eq!(scratch.tracked(), vec!["/www/tmp/a.php", "/www/tmp/b.php", "/www/tmp"]);

        assert_eq!(scratch.finish(Ok(7))?, 7);
        assert_eq!(
            host.deletes(),
            vec!["/www/tmp/a.php", "/www/tmp/b.php", "/www/tmp"]
        );
        assert!(!host.exists("/www/tmp"));
        Ok(())
    }

    #[test]
    fn failed_uploads_are_still_removed() {
        let host = Arc::new(FakeRemoteHost::new().failing_upload("/www/a.php"));
        let mut scratch = ScratchFiles::new(host.clone());
        let result = upload(&mut scratch, "/www/a.php");
        assert!(matches!(result, Err(PackagerError::UploadFailed { .. })));

        let finished = scratch.finish(result);
        assert!(matches!(finished, Err(PackagerError::UploadFailed { .. })));
        assert_eq!(host.deletes(), vec!["/www/a.php"]);
    }

    #[test]
    fn cleanup_failure_is_surfaced_after_success() -> anyhow::Result<()> {
        let host = Arc::new(FakeRemoteHost::new().failing_delete("/www/a.php"));
        let mut scratch = ScratchFiles::new(host.clone());
        upload(&mut scratch, "/www/a.php")?;

        match scratch.finish(Ok(())) {
            Err(PackagerError::Cleanup { path, primary, .. }) => {
                assert_eq!(path, "/www/a.php");
                assert!(primary.is_none());
            }
            other => anyhow::bail!("expected cleanup failure, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn cleanup_failure_keeps_the_primary_error() -> anyhow::Result<()> {
        let host = Arc::new(FakeRemoteHost::new().failing_delete("/www/a.php"));
        let mut scratch = ScratchFiles::new(host.clone());
        upload(&mut scratch, "/www/a.php")?;
        upload(&mut scratch, "/www/b.php")?;

        let outcome: PackagerResult<()> = Err(PackagerError::UnexpectedResponse {
            reason: "missing_name",
        });
        match scratch.finish(outcome) {
            Err(PackagerError::Cleanup {
                primary: Some(primary),
                ..
            }) => assert!(matches!(*primary, PackagerError::UnexpectedResponse { .. })),
            other => anyhow::bail!("expected combined failure, got {other:?}"),
        }
        assert_eq!(host.deletes(), vec!["/www/a.php", "/www/b.php"]);
        Ok(())
    }

    #[test]
    fn missing_files_count_as_removed() -> anyhow::Result<()> {
        let host = Arc::new(FakeRemoteHost::new());
        let mut scratch = ScratchFiles::new(host.clone());
        upload(&mut scratch, "/www/a.php")?;
        host.delete("/www/a.php")?;

        scratch.finish(Ok(()))?;
        assert_eq!(host.deletes().len(), 2);
        Ok(())
    }

    #[test]
    fn dropping_an_armed_guard_cleans_up() -> anyhow::Result<()> {
        let host = Arc::new(FakeRemoteHost::new());
        {
            let mut scratch = ScratchFiles::new(host.clone());
            upload(&mut scratch, "/www/a.php")?;
        }
        assert_eq!(host.deletes(), vec!["/www/a.php"]);
        Ok(())
    }
}
