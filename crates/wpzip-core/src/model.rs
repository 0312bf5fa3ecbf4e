//! Value types threaded through a packaging run.

use std::fmt::{self, Display, Formatter};

use url::Url;

use crate::error::{ModelError, ModelResult};

const DEFAULT_DB_HOST: &str = "localhost";

/// Absolute URL of a WordPress site, reduced to `scheme://authority`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrl {
    scheme: String,
    authority: String,
}

impl SiteUrl {
    /// Validate `input` as an absolute URL and keep only its scheme and host.
    ///
    /// Surrounding whitespace is ignored; any path, query, or trailing slash is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidSiteUrl`] when the input does not parse or
    /// lacks a scheme or host.
    pub fn parse(input: &str) -> ModelResult<Self> {
        let trimmed = input.trim();
        let parsed = Url::parse(trimmed).map_err(|_| ModelError::InvalidSiteUrl {
            value: trimmed.to_string(),
            reason: "unparseable",
        })?;
        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ModelError::InvalidSiteUrl {
                value: trimmed.to_string(),
                reason: "missing_host",
            })?;
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self {
            scheme: parsed.scheme().to_string(),
            authority,
        })
    }

    /// Host (and non-default port) without the scheme, e.g. `example.com`.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.authority
    }

    /// URL scheme as configured for the site.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// `https://` URL for a path relative to the site root.
    #[must_use]
    pub fn secure_url(&self, path: &str) -> String {
        format!("https://{}/{}", self.authority, path.trim_start_matches('/'))
    }

    /// `http://` URL for a path relative to the site root.
    #[must_use]
    pub fn insecure_url(&self, path: &str) -> String {
        format!("http://{}/{}", self.authority, path.trim_start_matches('/'))
    }
}

impl Display for SiteUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// Webroot directory on the remote host. Always renders with a trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPath(String);

impl PublicPath {
    /// Wrap a non-empty path.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyPublicPath`] when `value` is blank.
    pub fn new(value: impl Into<String>) -> ModelResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyPublicPath);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Path exactly as supplied.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Remote path of `name` directly under the webroot.
    #[must_use]
    pub fn join(&self, name: &str) -> String {
        format!("{self}{}", name.trim_start_matches('/'))
    }
}

impl Display for PublicPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.ends_with('/') {
            f.write_str(&self.0)
        } else {
            write!(f, "{}/", self.0)
        }
    }
}

/// Database connection settings read from `wp-config.php`.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseCredentials {
    /// Database account name.
    pub user: String,
    /// Raw password. Must be quoted before it reaches a shell.
    pub pass: String,
    /// Schema name.
    pub name: String,
    /// Server address as written in `DB_HOST`.
    pub host: String,
}

impl DatabaseCredentials {
    /// Build credentials, substituting `localhost` for an empty host.
    #[must_use]
    pub fn new(
        user: impl Into<String>,
        pass: impl Into<String>,
        name: impl Into<String>,
        host: Option<String>,
    ) -> Self {
        let host = host
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_HOST.to_string());
        Self {
            user: user.into(),
            pass: pass.into(),
            name: name.into(),
            host,
        }
    }

    /// Split `DB_HOST` into host, port, and socket parts.
    #[must_use]
    pub fn host_spec(&self) -> HostSpec {
        HostSpec::parse(&self.host)
    }
}

impl fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("name", &self.name)
            .field("host", &self.host)
            .finish()
    }
}

/// `DB_HOST` decomposed the way WordPress interprets it.
///
/// WordPress accepts `host`, `host:port`, `host:/path/to/socket`, and
/// bracketed IPv6 literals with an optional port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    /// Hostname or address.
    pub host: String,
    /// TCP port when one was given.
    pub port: Option<u16>,
    /// Unix socket path when one was given.
    pub socket: Option<String>,
}

impl HostSpec {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix('[')
            && let Some((address, tail)) = rest.split_once(']')
        {
            let port = tail.strip_prefix(':').and_then(|port| port.parse().ok());
            return Self {
                host: address.to_string(),
                port,
                socket: None,
            };
        }

        match raw.split_once(':') {
            Some((host, socket)) if socket.starts_with('/') => Self {
                host: host.to_string(),
                port: None,
                socket: Some(socket.to_string()),
            },
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => Self {
                    host: host.to_string(),
                    port: Some(port),
                    socket: None,
                },
                Err(_) => Self::plain(raw),
            },
            None => Self::plain(raw),
        }
    }

    fn plain(host: &str) -> Self {
        Self {
            host: host.to_string(),
            port: None,
            socket: None,
        }
    }
}

/// Everything the operations need to know about the site being exported.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    /// Public URL of the site.
    pub site_url: SiteUrl,
    /// Webroot on the remote host.
    pub public_path: PublicPath,
    /// Database connection settings.
    pub credentials: DatabaseCredentials,
    /// Table-name prefix, e.g. `wp_`.
    pub table_prefix: String,
}

/// Kind of a remote directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (not followed).
    Symlink,
    /// Sockets, devices, and anything else.
    Other,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDirEntry {
    /// Entry name without its parent path.
    pub name: String,
    /// Entry kind.
    pub kind: RemoteEntryKind,
}

impl RemoteDirEntry {
    /// Regular-file entry.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RemoteEntryKind::File,
        }
    }

    /// Directory entry.
    #[must_use]
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RemoteEntryKind::Directory,
        }
    }
}
