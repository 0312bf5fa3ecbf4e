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

//! Typed run settings for a wp-zip export.
//!
//! Layout: `model.rs` (settings sections), `defaults.rs` (default values),
//! `secret.rs` (password wrapper), `validate.rs` (pre-connection checks).

pub mod defaults;
pub mod error;
pub mod model;
pub mod secret;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    ArchiveSettings, ConnectionSettings, PartialArchive, RunSettings, SiteSettings,
    TimeoutSettings,
};
pub use secret::Secret;
pub use validate::validate;
