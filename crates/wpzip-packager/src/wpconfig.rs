//! `wp-config.php` parsing.
//!
//! # Design
//! - The file is fetched through the active [`FileEmitter`], so it works over
//!   either transfer strategy.
//! - Only literal `define()` calls and the `$table_prefix` assignment are read;
//!   the file is never executed.
//! - The first uncommented definition of each constant wins.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::debug;
use wpzip_core::{DatabaseCredentials, PublicPath};

use crate::emitter::FileEmitter;
use crate::error::{PackagerError, PackagerResult};

const WP_CONFIG: &str = "wp-config.php";

static DEFINE_PATTERN: OnceCell<Regex> = OnceCell::new();
static PREFIX_PATTERN: OnceCell<Regex> = OnceCell::new();

/// Values read from `wp-config.php`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WpConfigFields {
    /// Database connection settings.
    pub credentials: DatabaseCredentials,
    /// `$table_prefix`, e.g. `wp_`.
    pub table_prefix: String,
}

/// Reads the site configuration under a webroot.
pub trait WpConfigParser {
    /// Parse `wp-config.php` directly under `public_path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be fetched, is empty, or lacks a
    /// required field.
    fn parse_wp_config(&self, public_path: &PublicPath) -> PackagerResult<WpConfigFields>;
}

/// Fetches `wp-config.php` through a [`FileEmitter`].
pub struct EmitterWpConfigParser {
    emitter: Arc<dyn FileEmitter>,
}

impl EmitterWpConfigParser {
    /// Parser reading through `emitter`.
    #[must_use]
    pub fn new(emitter: Arc<dyn FileEmitter>) -> Self {
        Self { emitter }
    }
}

impl WpConfigParser for EmitterWpConfigParser {
    fn parse_wp_config(&self, public_path: &PublicPath) -> PackagerResult<WpConfigFields> {
        let path = public_path.join(WP_CONFIG);
        let mut contents = Vec::new();
        self.emitter.emit_single(&path, &mut |name, reader| {
            reader
                .read_to_end(&mut contents)
                .map(|_| ())
                .map_err(|source| PackagerError::io("wp_config.read", name, source))
        })?;
        debug!(%path, bytes = contents.len(), "fetched wp-config");

        let text = String::from_utf8_lossy(&contents);
        if text.trim().is_empty() {
            return Err(PackagerError::EmptyWpConfig { path });
        }
        parse_wp_config_contents(&text)
    }
}

/// Parse credentials and table prefix from `wp-config.php` source text.
///
/// # Errors
///
/// Returns [`PackagerError::MissingWpConfigField`] when `DB_NAME`, `DB_USER`,
/// or `DB_PASSWORD` is absent, [`PackagerError::MissingTablePrefix`] or
/// [`PackagerError::InvalidTablePrefix`] for the prefix, and
/// [`PackagerError::EmptyWpConfig`] for blank input.
pub fn parse_wp_config_contents(contents: &str) -> PackagerResult<WpConfigFields> {
    if contents.trim().is_empty() {
        return Err(PackagerError::EmptyWpConfig {
            path: WP_CONFIG.to_string(),
        });
    }

    let define = pattern(
        &DEFINE_PATTERN,
        "define",
        r#"define\(\s*['"](DB_NAME|DB_USER|DB_PASSWORD|DB_HOST)['"]\s*,\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")\s*\)\s*;"#,
    )?;

    let mut name = None;
    let mut user = None;
    let mut pass = None;
    let mut host = None;
    for captures in define.captures_iter(contents) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if is_commented(contents, whole.start()) {
            continue;
        }
        let (value, quote) = match (captures.get(2), captures.get(3)) {
            (Some(single), _) => (single.as_str(), '\''),
            (None, Some(double)) => (double.as_str(), '"'),
            (None, None) => continue,
        };
        let slot = match captures.get(1).map(|field| field.as_str()) {
            Some("DB_NAME") => &mut name,
            Some("DB_USER") => &mut user,
            Some("DB_PASSWORD") => &mut pass,
            Some("DB_HOST") => &mut host,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(unescape(value, quote));
        }
    }

    let name = name.ok_or(PackagerError::MissingWpConfigField { field: "DB_NAME" })?;
    let user = user.ok_or(PackagerError::MissingWpConfigField { field: "DB_USER" })?;
    let pass = pass.ok_or(PackagerError::MissingWpConfigField {
        field: "DB_PASSWORD",
    })?;

    Ok(WpConfigFields {
        credentials: DatabaseCredentials::new(user, pass, name, host),
        table_prefix: parse_table_prefix(contents)?,
    })
}

fn parse_table_prefix(contents: &str) -> PackagerResult<String> {
    let prefix = pattern(
        &PREFIX_PATTERN,
        "table_prefix",
        r#"\$table_prefix\s*=\s*(?:'([^']*)'|"([^"]*)")\s*;"#,
    )?;
    let value = prefix
        .captures_iter(contents)
        .filter(|captures| {
            captures
                .get(0)
                .is_some_and(|whole| !is_commented(contents, whole.start()))
        })
        .find_map(|captures| captures.get(1).or_else(|| captures.get(2)))
        .map(|value| value.as_str().to_string())
        .ok_or(PackagerError::MissingTablePrefix)?;

    if value.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        Ok(value)
    } else {
        Err(PackagerError::InvalidTablePrefix { value })
    }
}

fn pattern(
    cell: &'static OnceCell<Regex>,
    name: &'static str,
    source: &str,
) -> PackagerResult<&'static Regex> {
    cell.get_or_try_init(|| Regex::new(source))
        .map_err(|source| PackagerError::Pattern { name, source })
}

/// Returns `true` when the line holding `offset` starts with a PHP comment marker.
fn is_commented(contents: &str, offset: usize) -> bool {
    let line_start = contents[..offset].rfind('\n').map_or(0, |index| index + 1);
    let prefix = contents[line_start..offset].trim_start();
    ["//", "#", "*", "/*"]
        .iter()
        .any(|marker| prefix.starts_with(marker))
}

fn unescape(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some(next) if next == quote || next == '\\' || (quote == '"' && next == '$') => {
                out.push(next);
            }
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}
