//! Checks run before any connection is attempted.

use std::time::Duration;

use wpzip_core::{PublicPath, SiteUrl};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{ArchiveSettings, ConnectionSettings, RunSettings, SiteSettings, TimeoutSettings};

const FINGERPRINT_PREFIX: &str = "SHA256:";

/// Validate every section of `settings`, stopping at the first problem.
///
/// # Errors
///
/// Returns [`ConfigError::MissingField`] for empty required values and
/// [`ConfigError::InvalidField`] for values that cannot be used.
pub fn validate(settings: &RunSettings) -> ConfigResult<()> {
    validate_connection(&settings.connection)?;
    validate_site(&settings.site)?;
    validate_archive(&settings.archive)?;
    validate_timeouts(&settings.timeouts)
}

fn validate_connection(connection: &ConnectionSettings) -> ConfigResult<()> {
    require("connection", "host", &connection.host)?;
    require("connection", "username", &connection.username)?;
    if connection.port == 0 {
        return Err(ConfigError::invalid("connection", "port", "0", "out_of_range"));
    }
    if connection.channel_depth == 0 {
        return Err(ConfigError::invalid(
            "connection",
            "channel_depth",
            "0",
            "must_be_positive",
        ));
    }
    if let Some(fingerprint) = &connection.host_key {
        let digest = fingerprint.strip_prefix(FINGERPRINT_PREFIX).unwrap_or_default();
        if digest.is_empty() {
            return Err(ConfigError::invalid(
                "connection",
                "host_key",
                fingerprint.as_str(),
                "expected_sha256_fingerprint",
            ));
        }
    }
    Ok(())
}

fn validate_site(site: &SiteSettings) -> ConfigResult<()> {
    if let Some(url) = &site.site_url {
        SiteUrl::parse(url)
            .map_err(|_| ConfigError::invalid("site", "site_url", url.as_str(), "unparseable"))?;
    }
    if let Some(path) = &site.public_path {
        PublicPath::new(path.as_str())
            .map_err(|_| ConfigError::invalid("site", "public_path", path.as_str(), "empty"))?;
    }
    Ok(())
}

fn validate_archive(archive: &ArchiveSettings) -> ConfigResult<()> {
    if archive.output.as_os_str().is_empty() {
        return Err(ConfigError::MissingField {
            section: "archive",
            field: "output",
        });
    }
    if archive.output.is_dir() {
        return Err(ConfigError::invalid(
            "archive",
            "output",
            archive.output.display().to_string(),
            "is_directory",
        ));
    }
    Ok(())
}

fn validate_timeouts(timeouts: &TimeoutSettings) -> ConfigResult<()> {
    for (field, value) in [
        ("connect", timeouts.connect),
        ("http", timeouts.http),
        ("keepalive", timeouts.keepalive),
    ] {
        if value == Duration::ZERO {
            return Err(ConfigError::invalid("timeouts", field, "0s", "must_be_positive"));
        }
    }
    Ok(())
}

fn require(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingField { section, field })
    } else {
        Ok(())
    }
}
