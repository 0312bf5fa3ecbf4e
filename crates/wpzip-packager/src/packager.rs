//! Packaging facade: discovery, operation building, and archive creation.
//!
//! # Design
//! - Site info is resolved once, at construction; a `Packager` that exists
//!   always has a complete [`SiteInfo`].
//! - Every stage failure is wrapped with the stage that observed it.
//! - A failed run removes its partial archive unless told to keep it.

use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use wpzip_core::{
    FileUploadDeleter, HttpGetter, NameGenerator, Prompter, PublicPath, RemoteClient,
    RemoteCommandRunner, RemoteFileReader, SiteInfo, SiteUrl,
};

use crate::builder::{Builder, OperationsBuilder};
use crate::emitter::new_file_emitter;
use crate::error::{PackagerError, PackagerResult};
use crate::naming::RandomNames;
use crate::probe::CapabilityProbe;
use crate::progress::{ProgressReporter, SilentProgress};
use crate::runner::Runner;
use crate::site_info::determine_site_info;
use crate::wpconfig::EmitterWpConfigParser;

/// What to do with the output file when a run fails part-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialArchivePolicy {
    /// Delete the partially written archive.
    #[default]
    Remove,
    /// Leave the partial archive on disk.
    Keep,
}

/// Values the operator supplied up front; anything missing is discovered.
#[derive(Debug, Clone, Default)]
pub struct SiteRequest {
    /// Public site URL, if known.
    pub site_url: Option<SiteUrl>,
    /// Webroot on the remote host, if known.
    pub public_path: Option<PublicPath>,
}

/// Pluggable collaborators and policies for a packaging run.
#[derive(Clone)]
pub struct PackagerOptions {
    /// Source of scratch script names.
    pub names: Arc<dyn NameGenerator>,
    /// Progress sink for long transfers.
    pub progress: Arc<dyn ProgressReporter>,
    /// Partial archive handling on failure.
    pub partial_archive: PartialArchivePolicy,
}

impl Default for PackagerOptions {
    fn default() -> Self {
        Self {
            names: Arc::new(RandomNames),
            progress: Arc::new(SilentProgress),
            partial_archive: PartialArchivePolicy::default(),
        }
    }
}

/// Packages one WordPress site into a zip archive.
pub struct Packager {
    builder: Box<dyn OperationsBuilder>,
    runner: Runner,
    site: SiteInfo,
    partial_archive: PartialArchivePolicy,
}

impl Packager {
    /// Resolve the site behind `client` and prepare its operations.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::DetermineSiteInfo`] when discovery fails.
    pub fn new(
        client: Arc<dyn RemoteClient>,
        http: Arc<dyn HttpGetter>,
        prompter: &dyn Prompter,
        request: SiteRequest,
        options: PackagerOptions,
    ) -> PackagerResult<Self> {
        let remote_runner: Arc<dyn RemoteCommandRunner> = client.clone();
        let reader: Arc<dyn RemoteFileReader> = client.clone();
        let uploader: Arc<dyn FileUploadDeleter> = client;

        let probe: Arc<dyn RemoteCommandRunner> = Arc::new(CapabilityProbe::new(remote_runner));
        let emitter = new_file_emitter(Arc::clone(&probe), reader);
        let parser = EmitterWpConfigParser::new(Arc::clone(&emitter));

        let site = determine_site_info(
            request.site_url,
            request.public_path,
            &parser,
            probe.as_ref(),
            prompter,
        )
        .map_err(|source| PackagerError::DetermineSiteInfo {
            source: Box::new(source),
        })?;

        let builder = Builder::new(probe, uploader, emitter, http, options.names, options.progress);
        Ok(Self::from_parts(Box::new(builder), site, options.partial_archive))
    }

    /// Packager over an already-resolved site and a custom builder.
    #[must_use]
    pub fn from_parts(
        builder: Box<dyn OperationsBuilder>,
        site: SiteInfo,
        partial_archive: PartialArchivePolicy,
    ) -> Self {
        Self {
            builder,
            runner: Runner,
            site,
            partial_archive,
        }
    }

    /// Site this packager will export.
    #[must_use]
    pub const fn site_info(&self) -> &SiteInfo {
        &self.site
    }

    /// Build and run every operation into a new archive at `output`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::BuildOperations`],
    /// [`PackagerError::CreateArchive`], or [`PackagerError::RunOperations`]
    /// for the stage that failed.
    pub fn package(&self, output: &Path) -> PackagerResult<()> {
        let operations = self.build()?;
        let file = File::create(output).map_err(|source| PackagerError::CreateArchive {
            path: output.to_path_buf(),
            source,
        })?;

        let result = self
            .runner
            .run(operations, BufWriter::new(file))
            .and_then(|mut writer| {
                writer
                    .flush()
                    .map_err(|source| PackagerError::io("package.flush", output.display().to_string(), source))
            })
            .map_err(|source| PackagerError::RunOperations {
                source: Box::new(source),
            });

        match (&result, self.partial_archive) {
            (Ok(()), _) => info!(output = %output.display(), "archive written"),
            (Err(_), PartialArchivePolicy::Remove) => {
                if let Err(err) = fs::remove_file(output) {
                    warn!(output = %output.display(), error = %err, "could not remove partial archive");
                }
            }
            (Err(_), PartialArchivePolicy::Keep) => {
                warn!(output = %output.display(), "keeping partial archive");
            }
        }
        result
    }

    /// Build and run every operation into `writer`, returning it once the
    /// archive is finalised.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::BuildOperations`] or
    /// [`PackagerError::RunOperations`].
    pub fn package_into<W: Write + Seek>(&self, writer: W) -> PackagerResult<W> {
        let operations = self.build()?;
        self.runner
            .run(operations, writer)
            .map_err(|source| PackagerError::RunOperations {
                source: Box::new(source),
            })
    }

    fn build(&self) -> PackagerResult<Vec<Box<dyn crate::operations::Operation>>> {
        self.builder
            .build(&self.site)
            .map_err(|source| PackagerError::BuildOperations {
                source: Box::new(source),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::FileCallback;
    use crate::operations::Operation;
    use wpzip_core::DatabaseCredentials;

    struct Fixed {
        fail: bool,
    }

    struct Entry {
        fail: bool,
    }

    impl Operation for Entry {
        fn name(&self) -> &'static str {
            "download_files"
        }

        fn send_files(&self, callback: &mut FileCallback<'_>) -> PackagerResult<()> {
            callback("files/index.php", &mut "a".as_bytes())?;
            if self.fail {
                return Err(PackagerError::NotFound {
                    path: "/var/www/gone.php".into(),
                });
            }
            Ok(())
        }
    }

    impl OperationsBuilder for Fixed {
        fn build(&self, _site: &SiteInfo) -> PackagerResult<Vec<Box<dyn Operation>>> {
            Ok(vec![Box::new(Entry { fail: self.fail })])
        }
    }

    fn packager(fail: bool, policy: PartialArchivePolicy) -> anyhow::Result<Packager> {
        let site = SiteInfo {
            site_url: SiteUrl::parse("https://example.com")?,
            public_path: PublicPath::new("/var/www")?,
            credentials: DatabaseCredentials::new("u", "p", "db", None),
            table_prefix: "wp_".to_string(),
        };
        Ok(Packager::from_parts(Box::new(Fixed { fail }), site, policy))
    }

    #[test]
    fn successful_run_writes_the_archive() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("site.zip");
        packager(false, PartialArchivePolicy::Remove)?.package(&output)?;

        let bytes = fs::read(&output)?;
        let names = wpzip_test_support::assert::archive_names(&bytes)?;
        assert_eq!(names, vec!["files/index.php"]);
        Ok(())
    }

    #[test]
    fn failed_run_removes_partial_archive_by_default() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("site.zip");
        let result = packager(true, PartialArchivePolicy::default())?.package(&output);

        match result {
            Err(err) => assert_eq!(err.operation_name(), Some("download_files")),
            Ok(()) => anyhow::bail!("run should fail"),
        }
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn failed_run_can_keep_partial_archive() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("site.zip");
        let result = packager(true, PartialArchivePolicy::Keep)?.package(&output);

        assert!(matches!(result, Err(PackagerError::RunOperations { .. })));
        assert!(output.exists());
        Ok(())
    }

    #[test]
    fn unwritable_output_is_a_create_archive_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("missing").join("site.zip");
        let result = packager(false, PartialArchivePolicy::Remove)?.package(&output);
        assert!(matches!(result, Err(PackagerError::CreateArchive { .. })));
        Ok(())
    }
}
