//! Operation construction from resolved site info.

use std::sync::Arc;

use wpzip_core::{FileUploadDeleter, HttpGetter, NameGenerator, RemoteCommandRunner, SiteInfo};

use crate::database::new_database_exporter;
use crate::emitter::FileEmitter;
use crate::error::PackagerResult;
use crate::operations::{DownloadFiles, ExportDatabase, GenerateJson, Operation};
use crate::progress::ProgressReporter;

/// Produces the ordered operation list for a site.
pub trait OperationsBuilder {
    /// Build every operation needed to package `site`.
    ///
    /// # Errors
    ///
    /// Returns an error when an operation cannot be prepared.
    fn build(&self, site: &SiteInfo) -> PackagerResult<Vec<Box<dyn Operation>>>;
}

/// Builds download, database export, and metadata operations, in that order.
pub struct Builder {
    probe: Arc<dyn RemoteCommandRunner>,
    uploader: Arc<dyn FileUploadDeleter>,
    emitter: Arc<dyn FileEmitter>,
    http: Arc<dyn HttpGetter>,
    names: Arc<dyn NameGenerator>,
    progress: Arc<dyn ProgressReporter>,
}

impl Builder {
    /// Builder sharing the given collaborators across operations.
    #[must_use]
    pub fn new(
        probe: Arc<dyn RemoteCommandRunner>,
        uploader: Arc<dyn FileUploadDeleter>,
        emitter: Arc<dyn FileEmitter>,
        http: Arc<dyn HttpGetter>,
        names: Arc<dyn NameGenerator>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            probe,
            uploader,
            emitter,
            http,
            names,
            progress,
        }
    }
}

impl OperationsBuilder for Builder {
    fn build(&self, site: &SiteInfo) -> PackagerResult<Vec<Box<dyn Operation>>> {
        let exporter = new_database_exporter(
            Arc::clone(&self.probe),
            Arc::clone(&self.uploader),
            Arc::clone(&self.http),
            Arc::clone(&self.names),
            site,
        );
        Ok(vec![
            Box::new(DownloadFiles::new(
                Arc::clone(&self.emitter),
                site.public_path.clone(),
                Arc::clone(&self.progress),
            )),
            Box::new(ExportDatabase::new(exporter, Arc::clone(&self.progress))),
            Box::new(GenerateJson::new(
                Arc::clone(&self.uploader),
                Arc::clone(&self.http),
                Arc::clone(&self.names),
                site.clone(),
            )),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::SftpEmitter;
    use crate::progress::SilentProgress;
    use wpzip_core::{DatabaseCredentials, PublicPath, SiteUrl};
    use wpzip_test_support::mocks::{FakeHttpGetter, FakeRemoteHost, FixedNames};

    #[test]
    fn operations_are_built_in_fixed_order() -> anyhow::Result<()> {
        let host = Arc::new(FakeRemoteHost::new());
        let builder = Builder::new(
            host.clone(),
            host.clone(),
            Arc::new(SftpEmitter::new(host)),
            Arc::new(FakeHttpGetter::new()),
            Arc::new(FixedNames::new("tok")),
            Arc::new(SilentProgress),
        );
        let site = SiteInfo {
            site_url: SiteUrl::parse("https://example.com")?,
            public_path: PublicPath::new("/var/www")?,
            credentials: DatabaseCredentials::new("u", "p", "db", None),
            table_prefix: "wp_".to_string(),
        };

        let names: Vec<&str> = builder
            .build(&site)?
            .iter()
            .map(|operation| operation.name())
            .collect();
        assert_eq!(names, vec!["download_files", "export_database", "generate_json"]);
        Ok(())
    }
}
