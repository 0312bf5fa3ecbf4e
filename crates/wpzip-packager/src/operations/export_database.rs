use std::sync::Arc;

use tracing::info;

use super::{DATABASE_ENTRY, Operation};
use crate::database::DatabaseExporter;
use crate::emitter::FileCallback;
use crate::error::PackagerResult;
use crate::progress::{CountingReader, ProgressReporter};

/// Streams the database dump into `database.sql`.
pub struct ExportDatabase {
    exporter: Box<dyn DatabaseExporter>,
    progress: Arc<dyn ProgressReporter>,
}

impl ExportDatabase {
    /// Operation exporting through `exporter`.
    #[must_use]
    pub fn new(exporter: Box<dyn DatabaseExporter>, progress: Arc<dyn ProgressReporter>) -> Self {
        Self { exporter, progress }
    }
}

impl Operation for ExportDatabase {
    fn name(&self) -> &'static str {
        "export_database"
    }

    fn send_files(&self, callback: &mut FileCallback<'_>) -> PackagerResult<()> {
        info!(strategy = ?self.exporter.strategy(), "exporting database");
        let mut dump = self.exporter.export()?;

        let mut task = self.progress.start("Exporting database", None);
        let result = {
            let mut counted = CountingReader::new(dump.reader(), task.as_mut());
            callback(DATABASE_ENTRY, &mut counted)
        };
        task.finish();
        dump.finish(result)
    }
}
