//! Bulk transfer: one remote `tar` process decoded as it streams.

use std::io::{self, Read};
use std::sync::Arc;

use tar::{Archive, EntryType};
use tracing::{debug, warn};
use wpzip_core::RemoteCommandRunner;
use wpzip_core::shell::quote_if_needed;

use super::{EmitterStrategy, FileCallback, FileEmitter, directory_root, split_parent};
use crate::error::{PackagerError, PackagerResult};

const TRAILER: &str = "emit.trailer";

/// Emits files by decoding `tar --hard-dereference -C <parent> -cf - <target>`
/// output on the fly.
pub struct TarEmitter {
    runner: Arc<dyn RemoteCommandRunner>,
}

impl TarEmitter {
    /// Emitter that issues its commands through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn RemoteCommandRunner>) -> Self {
        Self { runner }
    }

    fn stream(
        &self,
        parent: &str,
        target: &str,
        callback: &mut FileCallback<'_>,
    ) -> PackagerResult<()> {
        let whole_directory = target == ".";
        let links = self.decode(parent, target, whole_directory, callback)?;
        // Hard links are re-read one by one; a lone name always arrives as a regular file.
        for link in links {
            debug!(%link, "re-reading hard-linked file");
            let nested = self.decode(parent, &link, whole_directory, callback)?;
            if !nested.is_empty() {
                return Err(PackagerError::tar(
                    "emit.link",
                    parent,
                    io::Error::new(io::ErrorKind::InvalidData, "hard link was not dereferenced"),
                ));
            }
        }
        Ok(())
    }

    /// Emit the regular files of one tar stream and return the raw names of
    /// hard-link entries, whose contents the stream does not carry.
    fn decode(
        &self,
        parent: &str,
        target: &str,
        whole_directory: bool,
        callback: &mut FileCallback<'_>,
    ) -> PackagerResult<Vec<String>> {
        let command = tar_command(parent, target);
        debug!(%command, "streaming remote tar");
        let stream = self
            .runner
            .run(&command)
            .map_err(|source| PackagerError::remote("emit.tar", parent, source))?;

        let mut archive = Archive::new(stream);
        let mut links = Vec::new();
        for entry in archive
            .entries()
            .map_err(|source| PackagerError::tar("emit.entries", parent, source))?
        {
            let mut entry =
                entry.map_err(|source| PackagerError::tar("emit.entry", parent, source))?;
            let raw = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let Some(relative) = relative_name(&raw, whole_directory) else {
                continue;
            };
            match entry.header().entry_type() {
                EntryType::Link => links.push(raw),
                kind if kind.is_file() => callback(&relative, &mut entry)?,
                _ => {}
            }
        }

        // Drain the trailer so a non-zero tar exit still surfaces as an error.
        io::copy(&mut archive.into_inner(), &mut io::sink())
            .map_err(|source| PackagerError::tar(TRAILER, parent, source))?;
        Ok(links)
    }
}

fn tar_command(parent: &str, target: &str) -> String {
    format!(
        "tar --hard-dereference -C {} -cf - {}",
        quote_if_needed(parent),
        quote_if_needed(target)
    )
}

/// Entry name with trailing separators removed and, for whole-directory
/// streams, the synthetic leading `.` segment dropped. `None` for the root.
fn relative_name(raw: &str, whole_directory: bool) -> Option<String> {
    let trimmed = raw.trim_end_matches('/');
    let mut segments: Vec<&str> = trimmed.split('/').collect();
    if whole_directory && segments.first() == Some(&".") {
        segments.remove(0);
    }
    let joined = segments.join("/");
    (!joined.is_empty()).then_some(joined)
}

impl FileEmitter for TarEmitter {
    fn strategy(&self) -> EmitterStrategy {
        EmitterStrategy::TarStream
    }

    fn estimate_size(&self, root: &str) -> Option<u64> {
        let command = format!("du -sb {} | awk '{{print $1}}'", quote_if_needed(root));
        let mut output = String::new();
        let measured = self
            .runner
            .run(&command)
            .map_err(|err| io::Error::other(err.to_string()))
            .and_then(|mut stream| stream.read_to_string(&mut output));
        if let Err(err) = measured {
            warn!(error = %err, "could not estimate remote directory size");
            return None;
        }
        match output.trim().parse::<u64>() {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(error = %err, "remote size estimate was not a number");
                None
            }
        }
    }

    fn emit_all(&self, root: &str, callback: &mut FileCallback<'_>) -> PackagerResult<()> {
        self.stream(&directory_root(root), ".", callback)
    }

    fn emit_single(&self, path: &str, callback: &mut FileCallback<'_>) -> PackagerResult<()> {
        let (parent, name) = split_parent(path);
        let mut emitted = 0_usize;
        let result = self.stream(&parent, &name, &mut |relative, reader| {
            emitted += 1;
            callback(relative, reader)
        });
        match result {
            Ok(()) if emitted > 0 => Ok(()),
            Ok(()) => Err(PackagerError::NotFound {
                path: path.to_string(),
            }),
            // tar exits non-zero after an empty archive when the name is missing.
            Err(PackagerError::Tar {
                operation: TRAILER,
                source,
                ..
            }) if emitted == 0 => {
                debug!(%path, error = %source, "remote tar found nothing");
                Err(PackagerError::NotFound {
                    path: path.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }
}
