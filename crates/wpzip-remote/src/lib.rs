//! Concrete remote collaborators: an SSH session implementing the shell and
//! file-transfer traits, and an HTTP getter.
//!
//! Layout:
//! - `ssh.rs`: connection, authentication, and host key pinning
//! - `exec.rs`: command execution and the streaming output reader
//! - `sftp.rs`: directory listing, file reads, and scratch-file writes
//! - `http.rs`: streaming HTTP GET
//!
//! The packager is synchronous; every type here owns a runtime handle and
//! bridges into it, so callers must not invoke these from inside an async
//! task.
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

mod error;
pub mod exec;
pub mod http;
mod sftp;
pub mod ssh;

pub use error::redact_command;
pub use exec::CommandReader;
pub use http::HttpFetcher;
pub use ssh::SshSession;
