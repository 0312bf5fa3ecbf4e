//! Assertions over produced zip archives.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use anyhow::Result;
use zip::ZipArchive;

/// Read every entry of an in-memory zip into a name-to-bytes map.
///
/// # Errors
///
/// Returns an error when the bytes are not a readable zip archive.
pub fn archive_entries(bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = BTreeMap::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        entries.insert(entry.name().to_string(), contents);
    }
    Ok(entries)
}

/// Entry names of an in-memory zip, in archive order.
///
/// # Errors
///
/// Returns an error when the bytes are not a readable zip archive.
pub fn archive_names(bytes: &[u8]) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    (0..archive.len())
        .map(|index| -> Result<String> { Ok(archive.by_index(index)?.name().to_string()) })
        .collect()
}
