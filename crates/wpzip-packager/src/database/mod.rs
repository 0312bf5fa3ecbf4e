//! Database export strategies.
//!
//! # Design
//! - One interface, two strategies: the remote `mysqldump` utility when it
//!   runs, otherwise a bundled PHP dumper fetched over HTTP.
//! - A dump is a stream; nothing is buffered locally beyond what the archive
//!   writer consumes.
//! - Scratch files used by a strategy stay alive until the stream has been
//!   consumed and are removed by [`DatabaseDump::finish`].

use std::io::Read;
use std::sync::Arc;

use tracing::info;
use wpzip_core::shell::{quote_if_needed, single_quote};
use wpzip_core::{
    DatabaseCredentials, FileUploadDeleter, HttpGetter, NameGenerator, RemoteCommandRunner,
    RemoteStream, SiteInfo,
};

use crate::error::PackagerResult;
use crate::scratch::ScratchFiles;

mod mysqldump;
mod php_script;

pub use self::mysqldump::MysqldumpExporter;
pub use self::php_script::PhpScriptExporter;

/// Command whose success selects the `mysqldump` strategy.
pub const MYSQLDUMP_PROBE: &str = "mysqldump --version";

/// Strategy behind a [`DatabaseExporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStrategy {
    /// Remote `mysqldump` over a command channel.
    Mysqldump,
    /// Bundled PHP dumper triggered over HTTP.
    PhpScript,
}

/// Produces a full SQL dump of the site database.
pub trait DatabaseExporter: Send + Sync {
    /// Strategy this exporter implements.
    fn strategy(&self) -> ExportStrategy;

    /// Start the dump and return its content stream.
    ///
    /// # Errors
    ///
    /// Returns a capability error when the strategy cannot run, or a remote
    /// error when the dump could not be started.
    fn export(&self) -> PackagerResult<DatabaseDump>;
}

/// An in-progress dump plus whatever scratch state must outlive it.
pub struct DatabaseDump {
    body: RemoteStream,
    scratch: Option<ScratchFiles>,
}

impl DatabaseDump {
    /// Dump with no remote scratch state.
    #[must_use]
    pub fn new(body: RemoteStream) -> Self {
        Self {
            body,
            scratch: None,
        }
    }

    pub(crate) fn with_scratch(body: RemoteStream, scratch: ScratchFiles) -> Self {
        Self {
            body,
            scratch: Some(scratch),
        }
    }

    /// SQL text stream.
    pub fn reader(&mut self) -> &mut dyn Read {
        &mut self.body
    }

    /// Close the stream, remove scratch files, and merge both with `outcome`.
    ///
    /// # Errors
    ///
    /// Returns `outcome`'s error, or a cleanup failure as described on
    /// [`ScratchFiles::finish`].
    pub fn finish(self, outcome: PackagerResult<()>) -> PackagerResult<()> {
        let Self { body, scratch } = self;
        drop(body);
        match scratch {
            Some(scratch) => scratch.finish(outcome),
            None => outcome,
        }
    }
}

/// Pick the `mysqldump` exporter when the utility runs remotely, the PHP
/// script exporter otherwise.
#[must_use]
pub fn new_database_exporter(
    probe: Arc<dyn RemoteCommandRunner>,
    uploader: Arc<dyn FileUploadDeleter>,
    http: Arc<dyn HttpGetter>,
    names: Arc<dyn NameGenerator>,
    site: &SiteInfo,
) -> Box<dyn DatabaseExporter> {
    if probe.can_run(MYSQLDUMP_PROBE) {
        info!("remote mysqldump available");
        Box::new(MysqldumpExporter::new(probe, site.credentials.clone()))
    } else {
        info!("remote mysqldump unavailable; falling back to the php dumper");
        Box::new(PhpScriptExporter::new(uploader, http, names, site.clone()))
    }
}

/// Connection arguments shared by `mysql` and `mysqldump`, ending with the
/// database name.
#[must_use]
pub fn mysql_credentials(credentials: &DatabaseCredentials) -> String {
    let spec = credentials.host_spec();
    let mut args = format!(
        "--user={} --password={} --host={}",
        single_quote(&credentials.user),
        single_quote(&credentials.pass),
        quote_if_needed(&spec.host)
    );
    if let Some(port) = spec.port {
        args.push_str(&format!(" --port={port}"));
    }
    if let Some(socket) = spec.socket {
        args.push_str(&format!(" --socket={}", quote_if_needed(&socket)));
    }
    args.push(' ');
    args.push_str(&quote_if_needed(&credentials.name));
    args
}

/// `text` with the quoted password replaced, for logging.
#[must_use]
pub fn redact(text: &str, credentials: &DatabaseCredentials) -> String {
    if credentials.pass.is_empty() {
        return text.to_string();
    }
    text.replace(
        &format!("--password={}", single_quote(&credentials.pass)),
        "--password='***'",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpzip_core::{PublicPath, SiteUrl};
    use wpzip_test_support::mocks::{FakeHttpGetter, FakeRemoteHost, FixedNames};

    fn credentials(pass: &str) -> DatabaseCredentials {
        DatabaseCredentials::new("user", pass, "wordpress", None)
    }

    #[test]
    fn passwords_are_single_quoted_with_embedded_quotes_escaped() {
        let cases = [
            ("Pass", "'Pass'"),
            ("Pa'ss", r"'Pa'\''ss'"),
            ("'Pass", r"''\''Pass'"),
            ("Pass'", r"'Pass'\'''"),
            ("Pa\"ss", "'Pa\"ss'"),
        ];
        for (pass, quoted) in cases {
            assert_eq!(
                mysql_credentials(&credentials(pass)),
                format!("--user='user' --password={quoted} --host=localhost wordpress")
            );
        }
    }

    #[test]
    fn host_port_and_socket_become_separate_arguments() {
        let with_port = DatabaseCredentials::new("u", "p", "db", Some("db.internal:3307".into()));
        assert_eq!(
            mysql_credentials(&with_port),
            "--user='u' --password='p' --host=db.internal --port=3307 db"
        );
        let with_socket =
            DatabaseCredentials::new("u", "p", "db", Some("localhost:/tmp/my sql.sock".into()));
        assert_eq!(
            mysql_credentials(&with_socket),
            "--user='u' --password='p' --host=localhost --socket='/tmp/my sql.sock' db"
        );
    }

    #[test]
    fn redaction_hides_the_password() {
        let creds = credentials("s3cr'et");
        let command = format!("mysqldump {}", mysql_credentials(&creds));
        let redacted = redact(&command, &creds);
        assert!(!redacted.contains("s3cr"));
        assert!(redacted.contains("--password='***'"));
    }

    fn site() -> anyhow::Result<SiteInfo> {
        Ok(SiteInfo {
            site_url: SiteUrl::parse("https://example.com")?,
            public_path: PublicPath::new("/var/www")?,
            credentials: credentials("pass"),
            table_prefix: "wp_".to_string(),
        })
    }

    #[test]
    fn factory_follows_the_mysqldump_probe() -> anyhow::Result<()> {
        let site = site()?;
        let with_dump = Arc::new(FakeRemoteHost::new().with_command(MYSQLDUMP_PROBE, "mysqldump 8.0"));
        let exporter = new_database_exporter(
            with_dump.clone(),
            with_dump,
            Arc::new(FakeHttpGetter::new()),
            Arc::new(FixedNames::new("token")),
            &site,
        );
        assert_eq!(exporter.strategy(), ExportStrategy::Mysqldump);

        let without = Arc::new(FakeRemoteHost::new());
        let exporter = new_database_exporter(
            without.clone(),
            without.clone(),
            Arc::new(FakeHttpGetter::new()),
            Arc::new(FixedNames::new("token")),
            &site,
        );
        assert_eq!(exporter.strategy(), ExportStrategy::PhpScript);
        assert_eq!(without.probes(), vec![MYSQLDUMP_PROBE.to_string()]);
        Ok(())
    }

    #[test]
    fn plain_dump_finish_passes_the_outcome_through() {
        let dump = DatabaseDump::new(Box::new(std::io::empty()));
        assert!(dump.finish(Ok(())).is_ok());
        let dump = DatabaseDump::new(Box::new(std::io::empty()));
        assert!(matches!(
            dump.finish(Err(crate::PackagerError::NoOperations)),
            Err(crate::PackagerError::NoOperations)
        ));
    }
}
