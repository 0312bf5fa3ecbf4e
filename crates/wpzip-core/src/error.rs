//! # Design
//!
//! - Provide constant-message errors for remote collaborators and domain validation.
//! - Keep the offending command, path, or URL as structured context instead of message text.
//! - Box transport-specific sources so this crate stays free of SSH and HTTP dependencies.

use std::error::Error;
use std::io;

use thiserror::Error;

/// Result alias for remote collaborator calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Result alias for domain value construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by the remote host collaborators (shell, file transfer, HTTP).
#[derive(Debug, Error)]
pub enum RemoteError {
    /// IO failure while reading from or writing to a remote stream.
    #[error("remote io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Remote path or URL involved.
        path: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The remote path does not exist.
    #[error("remote path not found")]
    NotFound {
        /// Missing remote path.
        path: String,
    },
    /// A remote command could not be launched or exited unsuccessfully.
    #[error("remote command failed")]
    CommandFailed {
        /// Command line with credentials redacted.
        command: String,
        /// Exit status reported by the remote shell, when one was received.
        status: Option<u32>,
        /// Tail of the command's standard error output.
        stderr: String,
    },
    /// The SSH or SFTP layer reported a failure.
    #[error("remote transport failure")]
    Transport {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Underlying transport error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// An HTTP request failed or returned a non-success status.
    #[error("http request failed")]
    Http {
        /// Requested URL.
        url: String,
        /// Response status when the server answered.
        status: Option<u16>,
        /// Underlying client error when available.
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    /// A remote operation exceeded its configured deadline.
    #[error("remote operation timed out")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
    },
    /// The run was cancelled while a remote operation was in flight.
    #[error("remote operation cancelled")]
    Cancelled {
        /// Operation that was interrupted.
        operation: &'static str,
    },
    /// The server refused the supplied credentials.
    #[error("authentication rejected")]
    AuthenticationRejected {
        /// Account name that was rejected.
        user: String,
    },
    /// The server presented a host key that does not match the pinned fingerprint.
    #[error("host key rejected")]
    HostKeyRejected {
        /// Fingerprint the server presented.
        fingerprint: String,
    },
}

impl RemoteError {
    /// Build an IO variant for a remote path.
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Build a transport variant from any boxed-compatible error.
    #[must_use]
    pub fn transport(
        operation: &'static str,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            operation,
            source: source.into(),
        }
    }

    /// Returns `true` when the error reports a missing remote path.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Validation failures for domain values.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The site URL was not an absolute URL with both scheme and host.
    #[error("invalid site url")]
    InvalidSiteUrl {
        /// Offending input.
        value: String,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// The public path was empty.
    #[error("public path cannot be empty")]
    EmptyPublicPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_helpers_build_variants() {
        let io_err = RemoteError::io("open", "/var/www", io::Error::other("boom"));
        assert!(matches!(io_err, RemoteError::Io { operation: "open", .. }));
        assert!(io_err.source().is_some());

        let transport = RemoteError::transport("connect", io::Error::other("refused"));
        assert!(transport.source().is_some());
        assert!(!transport.is_not_found());

        let missing = RemoteError::NotFound {
            path: "/missing".to_string(),
        };
        assert!(missing.is_not_found());
        assert_eq!(missing.to_string(), "remote path not found");
    }
}
