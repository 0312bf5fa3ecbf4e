//! Collaborator interfaces consumed by the packager.
//!
//! # Design
//! - Blocking `Read` streams keep the archive pipeline synchronous; async
//!   transports bridge into these traits at their own boundary.
//! - Every trait is `Send + Sync` so a single session can be shared behind `Arc`.

use std::io::{self, Read};

use crate::error::RemoteResult;
use crate::model::RemoteDirEntry;

/// Byte stream produced by a remote command, file, or HTTP response.
pub type RemoteStream = Box<dyn Read + Send>;

/// Runs shell commands on the remote host.
pub trait RemoteCommandRunner: Send + Sync {
    /// Returns `true` when `command` runs to a zero exit status.
    fn can_run(&self, command: &str) -> bool;

    /// Start `command` and stream its standard output.
    ///
    /// A non-zero exit status surfaces as an IO error at the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot be started.
    fn run(&self, command: &str) -> RemoteResult<RemoteStream>;
}

/// Read-only access to the remote filesystem.
pub trait RemoteFileReader: Send + Sync {
    /// List the entries of a remote directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be listed.
    fn read_dir(&self, path: &str) -> RemoteResult<Vec<RemoteDirEntry>>;

    /// Open a remote file for sequential reading.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened.
    fn open(&self, path: &str) -> RemoteResult<RemoteStream>;
}

/// Write access used for scratch files.
pub trait FileUploadDeleter: Send + Sync {
    /// Create or truncate `destination` and fill it from `contents`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be created or written.
    fn upload(&self, contents: &mut dyn Read, destination: &str) -> RemoteResult<()>;

    /// Remove a remote file or empty directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the path cannot be removed.
    fn delete(&self, path: &str) -> RemoteResult<()>;

    /// Create a remote directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    fn mkdir(&self, path: &str) -> RemoteResult<()>;
}

/// A full remote session: shell, file reads, and scratch-file writes.
pub trait RemoteClient: RemoteCommandRunner + RemoteFileReader + FileUploadDeleter {}

impl<T> RemoteClient for T where T: RemoteCommandRunner + RemoteFileReader + FileUploadDeleter {}

/// Fetches URLs from the site's web server.
pub trait HttpGetter: Send + Sync {
    /// Issue a GET request and stream the response body.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure or a non-success status.
    fn get(&self, url: &str) -> RemoteResult<RemoteStream>;
}

/// Asks the operator a question and returns the typed answer.
pub trait Prompter: Send + Sync {
    /// Print `question` and read a single line of input, without its newline.
    ///
    /// # Errors
    ///
    /// Returns an error when input cannot be read.
    fn prompt(&self, question: &str) -> io::Result<String>;
}

/// Source of random tokens for scratch-file names.
pub trait NameGenerator: Send + Sync {
    /// A fresh alphanumeric token.
    fn token(&self) -> String;
}
