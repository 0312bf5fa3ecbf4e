//! Default values for run settings.
//!
//! # Design
//! - Keep every default in one place so the CLI help text and the settings
//!   constructors cannot drift apart.

use std::time::Duration;

/// SSH port used when none is given.
pub const SSH_PORT: u16 = 22;
/// Deadline for establishing and authenticating the SSH session.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Deadline for a single HTTP request, including the streamed body.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(600);
/// Interval between SSH keepalive probes.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);
/// Chunks of remote command output buffered ahead of the reader.
pub const COMMAND_CHANNEL_DEPTH: usize = 32;
