//! Domain types and collaborator interfaces shared by the wp-zip crates.
//!
//! The packager core only talks to the remote host and the operator through
//! the traits in [`remote`]; concrete transports live in `wpzip-remote` and
//! in-memory fakes live in `wpzip-test-support`.
#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod model;
pub mod remote;
pub mod shell;

pub use error::{ModelError, ModelResult, RemoteError, RemoteResult};
pub use model::{
    DatabaseCredentials, HostSpec, PublicPath, RemoteDirEntry, RemoteEntryKind, SiteInfo, SiteUrl,
};
pub use remote::{
    FileUploadDeleter, HttpGetter, NameGenerator, Prompter, RemoteClient, RemoteCommandRunner,
    RemoteFileReader, RemoteStream,
};
