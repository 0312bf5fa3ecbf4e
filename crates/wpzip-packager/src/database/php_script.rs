use std::io::{Cursor, Read};
use std::sync::Arc;

use tracing::info;
use wpzip_core::{FileUploadDeleter, HttpGetter, NameGenerator, SiteInfo};
use zip::ZipArchive;
use zip::result::ZipError;

use super::{DatabaseDump, DatabaseExporter, ExportStrategy};
use crate::error::{PackagerError, PackagerResult};
use crate::http::fetch_site_path;
use crate::php;
use crate::scratch::ScratchFiles;

/// Directory created under the webroot for the dumper scripts.
pub(crate) const SCRATCH_DIR: &str = "wp-zip-database-export";

const DUMPER_ASSET: &[u8] = include_bytes!("../../assets/wp-zip-dumper-1.0.zip");
const DUMPER_ENTRY: &str = "wp-zip-dumper-1.0/src/Mysqldump.php";
const DUMPER_FILE: &str = "Mysqldump.php";

/// Uploads the bundled PHP dumper and streams its output over HTTP.
pub struct PhpScriptExporter {
    uploader: Arc<dyn FileUploadDeleter>,
    http: Arc<dyn HttpGetter>,
    names: Arc<dyn NameGenerator>,
    site: SiteInfo,
}

impl PhpScriptExporter {
    /// Exporter for `site`.
    #[must_use]
    pub fn new(
        uploader: Arc<dyn FileUploadDeleter>,
        http: Arc<dyn HttpGetter>,
        names: Arc<dyn NameGenerator>,
        site: SiteInfo,
    ) -> Self {
        Self {
            uploader,
            http,
            names,
            site,
        }
    }

    /// Upload the dumper and its invoker; returns the invoker's file name.
    fn stage(&self, scratch: &mut ScratchFiles, directory: &str) -> PackagerResult<String> {
        scratch.mkdir(directory)?;

        let dumper = bundled_dumper()?;
        scratch.upload(&mut dumper.as_slice(), &format!("{directory}/{DUMPER_FILE}"))?;

        let invoker = format!("dump-{}.php", self.names.token());
        let script = php::dump_invoker_script(&self.site.credentials, DUMPER_FILE);
        scratch.upload(&mut script.as_bytes(), &format!("{directory}/{invoker}"))?;
        Ok(invoker)
    }
}

impl DatabaseExporter for PhpScriptExporter {
    fn strategy(&self) -> ExportStrategy {
        ExportStrategy::PhpScript
    }

    fn export(&self) -> PackagerResult<DatabaseDump> {
        let directory = self.site.public_path.join(SCRATCH_DIR);
        let mut scratch = ScratchFiles::new(Arc::clone(&self.uploader));

        let invoker = match self.stage(&mut scratch, &directory) {
            Ok(invoker) => invoker,
            Err(err) => return scratch.finish(Err(err)),
        };

        info!(directory = %directory, "running php dumper");
        match fetch_site_path(
            self.http.as_ref(),
            &self.site.site_url,
            &format!("{SCRATCH_DIR}/{invoker}"),
        ) {
            Ok(body) => Ok(DatabaseDump::with_scratch(body, scratch)),
            Err(err) => scratch.finish(Err(err)),
        }
    }
}

/// Dumper source extracted from the embedded asset archive.
fn bundled_dumper() -> PackagerResult<Vec<u8>> {
    let asset_error = |source| PackagerError::Asset {
        entry: DUMPER_ENTRY,
        source,
    };
    let mut archive = ZipArchive::new(Cursor::new(DUMPER_ASSET)).map_err(asset_error)?;
    let mut entry = archive.by_name(DUMPER_ENTRY).map_err(asset_error)?;
    let mut contents = Vec::new();
    entry
        .read_to_end(&mut contents)
        .map_err(|err| asset_error(ZipError::from(err)))?;
    Ok(contents)
}
