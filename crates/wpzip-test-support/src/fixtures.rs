//! Test fixtures: synthetic tar streams and `wp-config.php` bodies.

use std::collections::BTreeSet;

use anyhow::{Result, ensure};
use tar::{Builder, EntryType, Header};

/// One entry of a synthetic tar stream, named byte-for-byte as given.
#[derive(Debug, Clone)]
pub enum TarEntry {
    /// Directory entry.
    Dir(String),
    /// Regular file entry with contents.
    File(String, Vec<u8>),
    /// Symbolic link entry pointing at a target.
    Symlink(String, String),
    /// Hard link entry naming an earlier entry of the same stream.
    HardLink(String, String),
}

/// Build a tar stream whose entry names are written verbatim.
///
/// `tar::Builder` normalises `./` prefixes away; GNU tar does not, so the
/// names are copied into the header directly.
///
/// # Errors
///
/// Returns an error if a name exceeds the 100-byte legacy header field or the
/// archive cannot be written.
pub fn tar_archive(entries: &[TarEntry]) -> Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());
    for entry in entries {
        match entry {
            TarEntry::Dir(name) => {
                let header = raw_header(name, EntryType::Directory, 0, None)?;
                builder.append(&header, std::io::empty())?;
            }
            TarEntry::File(name, contents) => {
                let header = raw_header(name, EntryType::Regular, contents.len(), None)?;
                builder.append(&header, contents.as_slice())?;
            }
            TarEntry::Symlink(name, target) => {
                let header = raw_header(name, EntryType::Symlink, 0, Some(target.as_str()))?;
                builder.append(&header, std::io::empty())?;
            }
            TarEntry::HardLink(name, target) => {
                let header = raw_header(name, EntryType::Link, 0, Some(target.as_str()))?;
                builder.append(&header, std::io::empty())?;
            }
        }
    }
    Ok(builder.into_inner()?)
}

/// Tar stream shaped like `tar -C <dir> -cf - .` for the given files.
///
/// Emits the `./` root, every intermediate directory, then each file under a
/// `./` prefix.
///
/// # Errors
///
/// Propagates failures from [`tar_archive`].
pub fn tar_of_directory(files: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut dirs = BTreeSet::new();
    for (path, _) in files {
        let mut prefix = String::new();
        let segments: Vec<&str> = path.split('/').collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            prefix.push_str(segment);
            prefix.push('/');
            dirs.insert(prefix.clone());
        }
    }

    let mut entries = vec![TarEntry::Dir("./".to_string())];
    entries.extend(dirs.into_iter().map(|dir| TarEntry::Dir(format!("./{dir}"))));
    entries.extend(
        files
            .iter()
            .map(|(path, contents)| TarEntry::File(format!("./{path}"), contents.to_vec())),
    );
    tar_archive(&entries)
}

fn raw_header(
    name: &str,
    kind: EntryType,
    size: usize,
    link: Option<&str>,
) -> Result<Header> {
    let bytes = name.as_bytes();
    ensure!(bytes.len() < 100, "fixture tar names must fit the legacy header");

    let mut header = Header::new_ustar();
    header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
    header.set_entry_type(kind);
    header.set_size(u64::try_from(size)?);
    header.set_mode(if kind == EntryType::Directory { 0o755 } else { 0o644 });
    if let Some(target) = link {
        header.set_link_name(target)?;
    }
    header.set_cksum();
    Ok(header)
}

/// Quote style used when rendering `define()` calls.
#[derive(Debug, Clone, Copy)]
pub enum Quote {
    /// `'value'`
    Single,
    /// `"value"`
    Double,
}

/// Render a minimal `wp-config.php` with the given credentials and prefix.
#[must_use]
pub fn wp_config(user: &str, pass: &str, name: &str, host: &str, prefix: &str) -> String {
    wp_config_styled(user, pass, name, host, prefix, Quote::Single)
}

/// Render a `wp-config.php` using the requested quote style throughout.
#[must_use]
pub fn wp_config_styled(
    user: &str,
    pass: &str,
    name: &str,
    host: &str,
    prefix: &str,
    quote: Quote,
) -> String {
    let q = match quote {
        Quote::Single => '\'',
        Quote::Double => '"',
    };
    format!(
        "<?php\n\
         /** The name of the database for WordPress */\n\
         define( {q}DB_NAME{q}, {q}{name}{q} );\n\
         define( {q}DB_USER{q}, {q}{user}{q} );\n\
         define( {q}DB_PASSWORD{q}, {q}{pass}{q} );\n\
         define( {q}DB_HOST{q}, {q}{host}{q} );\n\
         define( {q}DB_CHARSET{q}, {q}utf8mb4{q} );\n\
         $table_prefix = {q}{prefix}{q};\n\
         require_once ABSPATH . 'wp-settings.php';\n"
    )
}
