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
#![allow(clippy::redundant_pub_crate)]

//! Command-line front end that exports a live WordPress site to a zip file.
//!
//! Layout:
//! - `cli.rs`: argument parsing, settings assembly, and the run sequence
//! - `error.rs`: exit-code classification
//! - `prompt.rs`: terminal prompts for missing values and the password
//! - `progress.rs`: `indicatif` rendering of transfer progress
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod error;
pub(crate) mod progress;
pub(crate) mod prompt;

pub use cli::run;
