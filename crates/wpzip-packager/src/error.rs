//! # Design
//!
//! - Provide structured, constant-message errors for every packaging stage.
//! - Wrap lower-level failures with the stage or operation that observed them.
//! - Keep scratch-file cleanup failures distinct from the failure they followed.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use wpzip_core::{ModelError, RemoteError};

/// Result type for packaging operations.
pub type PackagerResult<T> = Result<T, PackagerError>;

/// Errors produced while discovering, extracting, and archiving a site.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// A remote collaborator call failed.
    #[error("remote call failed")]
    Remote {
        /// Operation that issued the call.
        operation: &'static str,
        /// Remote path, command, or URL involved.
        target: String,
        /// Underlying remote error.
        source: RemoteError,
    },
    /// A local or streamed IO failure.
    #[error("packager io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path or archive entry involved.
        target: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The remote tar stream could not be decoded.
    #[error("cannot decode remote tar stream")]
    Tar {
        /// Operation that was decoding.
        operation: &'static str,
        /// Remote directory being streamed.
        target: String,
        /// Underlying decoder error.
        source: io::Error,
    },
    /// The output archive rejected an entry or could not be finalised.
    #[error("archive write failed")]
    Archive {
        /// Operation that touched the archive.
        operation: &'static str,
        /// Entry name involved.
        entry: String,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
    /// The requested remote file was not emitted.
    #[error("remote file not found")]
    NotFound {
        /// Requested remote path.
        path: String,
    },
    /// `wp-config.php` was present but empty.
    #[error("wp-config.php is empty")]
    EmptyWpConfig {
        /// Remote path that was read.
        path: String,
    },
    /// A required `define()` was missing from `wp-config.php`.
    #[error("could not find credentials in wp-config.php")]
    MissingWpConfigField {
        /// Constant name that was not found.
        field: &'static str,
    },
    /// The `$table_prefix` assignment was missing from `wp-config.php`.
    #[error("could not find table prefix in wp-config.php")]
    MissingTablePrefix,
    /// `$table_prefix` contained characters MySQL identifiers cannot use unquoted.
    #[error("invalid table prefix")]
    InvalidTablePrefix {
        /// Offending prefix.
        value: String,
    },
    /// A bundled regular expression failed to compile.
    #[error("invalid pattern")]
    Pattern {
        /// Pattern identifier.
        name: &'static str,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// Parsing `wp-config.php` failed.
    #[error("cannot parse wp-config")]
    ParseWpConfig {
        /// Underlying parse failure.
        source: Box<PackagerError>,
    },
    /// A value supplied by the operator or discovered remotely was invalid.
    #[error("invalid value")]
    Validation {
        /// Field being validated.
        field: &'static str,
        /// Underlying validation failure.
        source: ModelError,
    },
    /// Reading an answer from the operator failed.
    #[error("cannot read operator input")]
    Prompt {
        /// Question that was asked.
        question: &'static str,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A required remote utility is not installed.
    #[error("utility not found")]
    UtilityNotFound {
        /// Utility name.
        utility: &'static str,
    },
    /// The database refused the credentials from `wp-config.php`.
    #[error("database credentials are incorrect")]
    CredentialsRejected {
        /// Database user that was rejected.
        user: String,
    },
    /// The embedded dumper asset could not be read.
    #[error("cannot read bundled asset")]
    Asset {
        /// Entry inside the asset archive.
        entry: &'static str,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
    /// A scratch file could not be uploaded.
    #[error("could not upload file")]
    UploadFailed {
        /// Destination path.
        path: String,
        /// Underlying remote error.
        source: RemoteError,
    },
    /// Neither the secure nor the insecure URL could be fetched.
    #[error("invalid response from server")]
    InvalidResponse {
        /// Last URL attempted.
        url: String,
        /// Underlying HTTP error.
        source: RemoteError,
    },
    /// The server answered with a body that is not the expected document.
    #[error("unexpected response from server")]
    UnexpectedResponse {
        /// Static reason for the rejection.
        reason: &'static str,
    },
    /// Deleting a scratch file failed.
    ///
    /// When the cleanup ran after another failure, that failure is kept in
    /// `primary` so neither is lost.
    #[error("error deleting scratch file")]
    Cleanup {
        /// First path that could not be deleted.
        path: String,
        /// Underlying remote error.
        source: RemoteError,
        /// Failure that preceded the cleanup, if any.
        primary: Option<Box<PackagerError>>,
    },
    /// The runner was given no operations.
    #[error("no operations to run")]
    NoOperations,
    /// An operation failed; later operations were not run.
    #[error("operation failed")]
    Operation {
        /// Name of the failing operation.
        operation: &'static str,
        /// Underlying failure.
        source: Box<PackagerError>,
    },
    /// Site discovery failed.
    #[error("cannot determine site info")]
    DetermineSiteInfo {
        /// Underlying failure.
        source: Box<PackagerError>,
    },
    /// Operation construction failed.
    #[error("cannot build operations")]
    BuildOperations {
        /// Underlying failure.
        source: Box<PackagerError>,
    },
    /// The output archive could not be created.
    #[error("cannot create zip file")]
    CreateArchive {
        /// Output path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Running the operations into the archive failed.
    #[error("cannot run operations")]
    RunOperations {
        /// Underlying failure.
        source: Box<PackagerError>,
    },
}

impl PackagerError {
    pub(crate) fn remote(
        operation: &'static str,
        target: impl Into<String>,
        source: RemoteError,
    ) -> Self {
        Self::Remote {
            operation,
            target: target.into(),
            source,
        }
    }

    pub(crate) fn io(operation: &'static str, target: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation,
            target: target.into(),
            source,
        }
    }

    pub(crate) fn tar(operation: &'static str, target: impl Into<String>, source: io::Error) -> Self {
        Self::Tar {
            operation,
            target: target.into(),
            source,
        }
    }

    pub(crate) fn archive(
        operation: &'static str,
        entry: impl Into<String>,
        source: zip::result::ZipError,
    ) -> Self {
        Self::Archive {
            operation,
            entry: entry.into(),
            source,
        }
    }

    /// Wrap `self` as the failure of the named operation.
    #[must_use]
    pub fn in_operation(self, operation: &'static str) -> Self {
        Self::Operation {
            operation,
            source: Box::new(self),
        }
    }

    /// Name of the operation this error is attributed to, if any.
    #[must_use]
    pub fn operation_name(&self) -> Option<&'static str> {
        match self {
            Self::Operation { operation, .. } => Some(*operation),
            Self::RunOperations { source } => source.operation_name(),
            _ => None,
        }
    }

    /// Returns `true` when this error, or any wrapped stage error, is a
    /// validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation { .. } => true,
            Self::DetermineSiteInfo { source }
            | Self::BuildOperations { source }
            | Self::RunOperations { source }
            | Self::ParseWpConfig { source }
            | Self::Operation { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn packager_error_helpers_build_variants() {
        let remote = PackagerError::remote(
            "emit_all.read_dir",
            "/var/www",
            RemoteError::NotFound {
                path: "/var/www".into(),
            },
        );
        assert!(matches!(remote, PackagerError::Remote { .. }));
        assert!(remote.source().is_some());

        let io_err = PackagerError::io("write_entry", "files/a", io::Error::other("io"));
        assert!(io_err.source().is_some());

        let tar_err = PackagerError::tar("emit.decode", "/var/www", io::Error::other("bad"));
        assert_eq!(tar_err.to_string(), "cannot decode remote tar stream");

        let zip_err =
            PackagerError::archive("run.finish", "", zip::result::ZipError::FileNotFound);
        assert!(zip_err.source().is_some());
    }

    #[test]
    fn operation_attribution_survives_stage_wrapping() {
        let err = PackagerError::UtilityNotFound {
            utility: "mysqldump",
        }
        .in_operation("export_database");
        let wrapped = PackagerError::RunOperations {
            source: Box::new(err),
        };
        assert_eq!(wrapped.operation_name(), Some("export_database"));
        assert!(!wrapped.is_validation());
    }

    #[test]
    fn validation_is_detected_through_stages() {
        let err = PackagerError::DetermineSiteInfo {
            source: Box::new(PackagerError::Validation {
                field: "public_path",
                source: ModelError::EmptyPublicPath,
            }),
        };
        assert!(err.is_validation());
    }
}
