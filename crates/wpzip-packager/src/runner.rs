//! Sequential execution of operations into a zip archive.
//!
//! # Design
//! - The runner exclusively owns the archive writer; operations only see the
//!   per-entry callback.
//! - Operations run strictly in order. The first failure stops the run and is
//!   attributed to the operation that produced it.
//! - The archive is finalised on every exit path once it has been opened.

use std::io::{self, Read, Seek, Write};

use tracing::{debug, info, warn};
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::error::{PackagerError, PackagerResult};
use crate::operations::Operation;

/// Streams every operation's entries into a single zip.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runner;

impl Runner {
    /// Run `operations` in order, writing their entries into `writer`.
    ///
    /// Returns the writer after the archive has been finalised.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::NoOperations`] for an empty list without
    /// touching `writer`, and [`PackagerError::Operation`] naming the first
    /// operation that failed.
    pub fn run<W: Write + Seek>(
        &self,
        operations: Vec<Box<dyn Operation>>,
        writer: W,
    ) -> PackagerResult<W> {
        if operations.is_empty() {
            return Err(PackagerError::NoOperations);
        }

        let mut archive = ZipWriter::new(writer);
        for operation in &operations {
            let name = operation.name();
            info!(operation = name, "running operation");
            let result =
                operation.send_files(&mut |entry, reader| write_entry(&mut archive, entry, reader));
            if let Err(err) = result {
                if let Err(close) = archive.finish() {
                    warn!(error = %close, "could not finalise partial archive");
                }
                return Err(err.in_operation(name));
            }
        }

        archive
            .finish()
            .map_err(|source| PackagerError::archive("run.finish", "", source))
    }
}

fn write_entry<W: Write + Seek>(
    archive: &mut ZipWriter<W>,
    entry: &str,
    reader: &mut dyn Read,
) -> PackagerResult<()> {
    let options = FileOptions::default().large_file(true);
    archive
        .start_file(entry, options)
        .map_err(|source| PackagerError::archive("run.start_entry", entry, source))?;
    let bytes = io::copy(reader, archive)
        .map_err(|source| PackagerError::io("run.copy_entry", entry, source))?;
    debug!(%entry, bytes, "archived entry");
    Ok(())
}
