//! Packaging pipeline that turns a remote WordPress site into a single zip.
//!
//! Layout:
//! - `probe.rs`: cached remote capability checks
//! - `emitter/`: tar-stream and per-file directory emitters
//! - `database/`: mysqldump and PHP-script database exporters
//! - `wpconfig.rs` and `site_info.rs`: site discovery
//! - `operations/`: download, database export, and metadata operations
//! - `builder.rs`, `runner.rs`, `packager.rs`: orchestration into the archive
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

pub mod builder;
pub mod database;
pub mod emitter;
pub mod error;
mod http;
pub mod naming;
pub mod operations;
pub mod packager;
mod php;
pub mod probe;
pub mod progress;
pub mod runner;
pub mod scratch;
pub mod site_info;
pub mod wpconfig;

pub use builder::{Builder, OperationsBuilder};
pub use database::{DatabaseDump, DatabaseExporter, ExportStrategy, new_database_exporter};
pub use emitter::{EmitterStrategy, FileCallback, FileEmitter, new_file_emitter};
pub use error::{PackagerError, PackagerResult};
pub use naming::RandomNames;
pub use operations::Operation;
pub use packager::{Packager, PackagerOptions, PartialArchivePolicy, SiteRequest};
pub use probe::CapabilityProbe;
pub use progress::{ProgressReporter, ProgressTask, SilentProgress};
pub use runner::Runner;
pub use scratch::ScratchFiles;
pub use site_info::determine_site_info;
pub use wpconfig::{EmitterWpConfigParser, WpConfigFields, WpConfigParser};
