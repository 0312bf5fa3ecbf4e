use std::sync::Arc;

use tracing::info;
use wpzip_core::PublicPath;

use super::{FILES_PREFIX, Operation};
use crate::emitter::{FileCallback, FileEmitter};
use crate::error::PackagerResult;
use crate::progress::{CountingReader, ProgressReporter};

/// Copies every regular file under the webroot into `files/`.
pub struct DownloadFiles {
    emitter: Arc<dyn FileEmitter>,
    public_path: PublicPath,
    progress: Arc<dyn ProgressReporter>,
}

impl DownloadFiles {
    /// Operation downloading `public_path` through `emitter`.
    #[must_use]
    pub fn new(
        emitter: Arc<dyn FileEmitter>,
        public_path: PublicPath,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            emitter,
            public_path,
            progress,
        }
    }
}

impl Operation for DownloadFiles {
    fn name(&self) -> &'static str {
        "download_files"
    }

    fn send_files(&self, callback: &mut FileCallback<'_>) -> PackagerResult<()> {
        let root = self.public_path.to_string();
        let total = self.emitter.estimate_size(&root);
        info!(root = %root, total_bytes = ?total, "downloading site files");

        let mut task = self.progress.start("Downloading files", total);
        let mut files = 0_u64;
        let result = self.emitter.emit_all(&root, &mut |path, reader| {
            files += 1;
            let mut counted = CountingReader::new(reader, task.as_mut());
            callback(&format!("{FILES_PREFIX}{path}"), &mut counted)
        });
        task.finish();
        info!(files, "site files downloaded");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::TarEmitter;
    use crate::progress::tests::{Event, RecordingProgress};
    use std::collections::BTreeMap;
    use wpzip_test_support::fixtures::tar_of_directory;
    use wpzip_test_support::mocks::FakeRemoteHost;

    #[test]
    fn files_land_under_the_files_prefix_with_progress() -> anyhow::Result<()> {
        let stream = tar_of_directory(&[("index.php", &b"a"[..]), ("wp-config.php", &b"b"[..])])?;
        let host = Arc::new(
            FakeRemoteHost::new()
                .with_command("tar --hard-dereference -C /var/www/ -cf - .", stream)
                .with_command("du -sb /var/www/ | awk '{print $1}'", "2\n"),
        );
        let progress = RecordingProgress::default();
        let operation = DownloadFiles::new(
            Arc::new(TarEmitter::new(host)),
            PublicPath::new("/var/www")?,
            Arc::new(progress.clone()),
        );

        let mut seen = BTreeMap::new();
        operation.send_files(&mut |name, reader| {
            let mut body = Vec::new();
            reader
                .read_to_end(&mut body)
                .map_err(|source| crate::PackagerError::io("test.read", name, source))?;
            seen.insert(name.to_string(), body);
            Ok(())
        })?;

        assert_eq!(
            seen,
            BTreeMap::from([
                ("files/index.php".to_string(), b"a".to_vec()),
                ("files/wp-config.php".to_string(), b"b".to_vec()),
            ])
        );
        let events = progress.events();
        assert_eq!(
            events.first(),
            Some(&Event::Start("Downloading files".to_string(), Some(2)))
        );
        assert_eq!(events.last(), Some(&Event::Finish));
        Ok(())
    }
}
