//! Typed settings for one export run.
//!
//! # Design
//! - Pure data carriers; the CLI fills them from flags and environment, and
//!   the remote and packager crates read them.
//! - Every section has a constructor applying the defaults in
//!   [`crate::defaults`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::secret::Secret;

/// Everything needed to connect to a host and package its site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    /// SSH connection parameters.
    pub connection: ConnectionSettings,
    /// Operator-supplied site values; missing ones are discovered.
    pub site: SiteSettings,
    /// Output archive location and failure policy.
    pub archive: ArchiveSettings,
    /// Network deadlines.
    pub timeouts: TimeoutSettings,
}

impl RunSettings {
    /// Settings for `username@host` writing to `output`, with defaults
    /// everywhere else.
    #[must_use]
    pub fn new(host: impl Into<String>, username: impl Into<String>, output: PathBuf) -> Self {
        Self {
            connection: ConnectionSettings::new(host, username),
            site: SiteSettings::default(),
            archive: ArchiveSettings::new(output),
            timeouts: TimeoutSettings::default(),
        }
    }
}

/// SSH connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Remote host name or address.
    pub host: String,
    /// Remote SSH port.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Login password; prompted for when absent.
    pub password: Option<Secret>,
    /// Expected `SHA256:` fingerprint of the server host key, if pinned.
    pub host_key: Option<String>,
    /// Chunks of command output buffered ahead of the reader.
    pub channel_depth: usize,
}

impl ConnectionSettings {
    /// Connection to `host` as `username` on the default port.
    #[must_use]
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: defaults::SSH_PORT,
            username: username.into(),
            password: None,
            host_key: None,
            channel_depth: defaults::COMMAND_CHANNEL_DEPTH,
        }
    }
}

/// Site values supplied up front.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteSettings {
    /// Public site URL.
    pub site_url: Option<String>,
    /// Webroot on the remote host.
    pub public_path: Option<String>,
}

/// What happens to the output file when a run fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialArchive {
    /// Delete the partial archive.
    #[default]
    Remove,
    /// Keep the partial archive for inspection.
    Keep,
}

/// Output archive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSettings {
    /// Path of the zip file to create.
    pub output: PathBuf,
    /// Partial archive policy.
    pub partial: PartialArchive,
}

impl ArchiveSettings {
    /// Archive written to `output`, removed on failure.
    #[must_use]
    pub fn new(output: PathBuf) -> Self {
        Self {
            output,
            partial: PartialArchive::default(),
        }
    }
}

/// Network deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// SSH connect and authentication deadline.
    pub connect: Duration,
    /// Per-request HTTP deadline.
    pub http: Duration,
    /// SSH keepalive interval.
    pub keepalive: Duration,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            connect: defaults::CONNECT_TIMEOUT,
            http: defaults::HTTP_TIMEOUT,
            keepalive: defaults::KEEPALIVE_INTERVAL,
        }
    }
}
