//! Extraction tasks that push archive entries through a callback.
//!
//! # Design
//! - Operations never see the archive writer; they only call the callback.
//! - Each operation is invoked once per run and is independent of the others.

use crate::emitter::FileCallback;
use crate::error::PackagerResult;

mod download_files;
mod export_database;
mod generate_json;

pub use self::download_files::DownloadFiles;
pub use self::export_database::ExportDatabase;
pub use self::generate_json::GenerateJson;

/// Archive directory holding every site file.
pub const FILES_PREFIX: &str = "files/";
/// Archive entry for the SQL dump.
pub const DATABASE_ENTRY: &str = "database.sql";
/// Archive entry for the site metadata document.
pub const METADATA_ENTRY: &str = "wpmigrate-export.json";

/// A self-contained extraction task producing zero or more archive entries.
pub trait Operation: Send {
    /// Stable name used to attribute failures.
    fn name(&self) -> &'static str;

    /// Emit every entry of this operation through `callback`.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the operation itself or of `callback`.
    fn send_files(&self, callback: &mut FileCallback<'_>) -> PackagerResult<()>;
}
