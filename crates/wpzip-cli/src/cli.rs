//! Argument parsing and the end-to-end run sequence.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::runtime::{self, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wpzip_config::{ConfigError, PartialArchive, RunSettings, Secret, validate};
use wpzip_core::{PublicPath, SiteUrl};
use wpzip_packager::{
    Packager, PackagerError, PackagerOptions, PartialArchivePolicy, ProgressReporter, RandomNames,
    SilentProgress, SiteRequest,
};
use wpzip_remote::{HttpFetcher, SshSession};
use wpzip_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, RunContext, init_logging};

use crate::error::{CliError, CliResult};
use crate::progress::BarProgress;
use crate::prompt::{TerminalPrompter, read_password};

#[derive(Parser, Debug)]
#[command(
    name = "wp-zip",
    version,
    about = "Export an existing WordPress site to a zip file",
    long_about = "Generate a complete archive of a WordPress site's files and database, \
                  which can be used to migrate the site to another host or to create a \
                  local development environment.",
    disable_help_flag = true
)]
pub(crate) struct Cli {
    /// SFTP host.
    #[arg(short = 'h', long, env = "WPZIP_HOST")]
    host: String,
    /// SFTP username.
    #[arg(short = 'u', long, env = "WPZIP_USERNAME")]
    username: String,
    /// SFTP password; prompted for when omitted.
    #[arg(short = 'p', long, env = "WPZIP_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// SFTP port.
    #[arg(short = 'P', long, env = "WPZIP_PORT", default_value_t = 22)]
    port: u16,
    /// URL of the live site; detected from the database when omitted.
    #[arg(short = 'd', long, env = "WPZIP_DOMAIN")]
    domain: Option<String>,
    /// Path to the public directory of the live site; detected when omitted.
    #[arg(short = 'w', long, env = "WPZIP_WEBROOT")]
    webroot: Option<String>,
    /// Expected `SHA256:` fingerprint of the server host key.
    #[arg(long, env = "WPZIP_HOST_KEY")]
    host_key: Option<String>,
    /// Seconds allowed for connecting and authenticating.
    #[arg(long, env = "WPZIP_CONNECT_TIMEOUT")]
    connect_timeout: Option<u64>,
    /// Seconds allowed for each HTTP request.
    #[arg(long, env = "WPZIP_HTTP_TIMEOUT")]
    http_timeout: Option<u64>,
    /// Keep the output file when packaging fails.
    #[arg(long, env = "WPZIP_KEEP_PARTIAL")]
    keep_partial: bool,
    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "WPZIP_LOG_FORMAT", default_value = "pretty")]
    log_format: String,
    /// Suppress progress bars.
    #[arg(short = 'q', long, env = "WPZIP_QUIET")]
    quiet: bool,
    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
    /// Output zip file.
    output: PathBuf,
}

impl Cli {
    fn settings(&self) -> RunSettings {
        let mut settings =
            RunSettings::new(self.host.clone(), self.username.clone(), self.output.clone());
        settings.connection.port = self.port;
        settings.connection.password = self.password.clone().map(Secret::from);
        settings.connection.host_key.clone_from(&self.host_key);
        settings.site.site_url.clone_from(&self.domain);
        settings.site.public_path.clone_from(&self.webroot);
        if self.keep_partial {
            settings.archive.partial = PartialArchive::Keep;
        }
        if let Some(seconds) = self.connect_timeout {
            settings.timeouts.connect = Duration::from_secs(seconds);
        }
        if let Some(seconds) = self.http_timeout {
            settings.timeouts.http = Duration::from_secs(seconds);
        }
        settings
    }
}

/// Parses arguments, packages the site, and returns the process exit code.
#[must_use]
pub fn run() -> i32 {
    let cli = Cli::parse();
    match execute(&cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn execute(cli: &Cli) -> CliResult<()> {
    let format = cli
        .log_format
        .parse::<LogFormat>()
        .map_err(|_| CliError::validation(format!("unknown log format `{}`", cli.log_format)))?;
    init_logging(&LoggingConfig {
        level: DEFAULT_LOG_LEVEL,
        format,
        version: env!("CARGO_PKG_VERSION"),
    })
    .map_err(CliError::failure)?;

    let mut settings = cli.settings();
    validate(&settings).map_err(|err| CliError::validation(describe(&err)))?;
    let request = site_request(&settings)?;
    if settings.connection.password.is_none() {
        let password = read_password()
            .context("reading password")
            .map_err(CliError::failure)?;
        settings.connection.password = Some(Secret::from(password));
    }

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")
        .map_err(CliError::failure)?;
    let cancel = CancellationToken::new();
    watch_interrupt(&runtime, cancel.clone());

    let run = RunContext::enter(&settings.connection.host);
    let result = package(&runtime, &settings, request, cli.quiet, cancel);
    runtime.shutdown_background();
    match &result {
        Ok(()) => info!(run_id = %run.run_id(), "export finished"),
        Err(err) => warn!(run_id = %run.run_id(), code = err.exit_code(), "export failed"),
    }
    result
}

fn package(
    runtime: &Runtime,
    settings: &RunSettings,
    request: SiteRequest,
    quiet: bool,
    cancel: CancellationToken,
) -> CliResult<()> {
    let session = runtime
        .block_on(SshSession::connect(
            &settings.connection,
            &settings.timeouts,
            cancel,
        ))
        .with_context(|| format!("connecting to {}", settings.connection.host))
        .map_err(CliError::failure)?;
    let session = Arc::new(session);
    let http = HttpFetcher::new(runtime.handle().clone(), settings.timeouts.http)
        .context("building http client")
        .map_err(CliError::failure)?;

    let progress: Arc<dyn ProgressReporter> = if quiet || !io::stderr().is_terminal() {
        Arc::new(SilentProgress)
    } else {
        Arc::new(BarProgress)
    };
    let options = PackagerOptions {
        names: Arc::new(RandomNames),
        progress,
        partial_archive: match settings.archive.partial {
            PartialArchive::Remove => PartialArchivePolicy::Remove,
            PartialArchive::Keep => PartialArchivePolicy::Keep,
        },
    };

    let result = Packager::new(
        session.clone(),
        Arc::new(http),
        &TerminalPrompter,
        request,
        options,
    )
    .and_then(|packager| {
        info!(
            site = %packager.site_info().site_url.domain(),
            output = %settings.archive.output.display(),
            "packaging site"
        );
        packager.package(&settings.archive.output)
    })
    .map_err(packaging_error);

    match Arc::try_unwrap(session) {
        Ok(session) => {
            if let Err(err) = runtime.block_on(session.close()) {
                debug!(error = %err, "ssh disconnect failed");
            }
        }
        Err(_) => debug!("ssh session still shared; skipping disconnect"),
    }
    result
}

/// Invalid operator answers exit like bad flags; everything else is a failed run.
fn packaging_error(err: PackagerError) -> CliError {
    if err.is_validation() {
        CliError::validation(format!("{:#}", anyhow::Error::from(err)))
    } else {
        CliError::failure(err)
    }
}

fn site_request(settings: &RunSettings) -> CliResult<SiteRequest> {
    let site_url = settings
        .site
        .site_url
        .as_deref()
        .map(SiteUrl::parse)
        .transpose()
        .map_err(|err| CliError::validation(format!("invalid --domain: {err}")))?;
    let public_path = settings
        .site
        .public_path
        .as_deref()
        .map(PublicPath::new)
        .transpose()
        .map_err(|err| CliError::validation(format!("invalid --webroot: {err}")))?;
    Ok(SiteRequest {
        site_url,
        public_path,
    })
}

fn watch_interrupt(runtime: &Runtime, cancel: CancellationToken) {
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling");
            cancel.cancel();
        }
    });
}

fn describe(err: &ConfigError) -> String {
    match err {
        ConfigError::MissingField { .. } => format!("{err}: {}", err.field_path()),
        ConfigError::InvalidField {
            value: Some(value),
            reason,
            ..
        } => format!("{err}: {} = `{value}` ({reason})", err.field_path()),
        ConfigError::InvalidField { reason, .. } => {
            format!("{err}: {} ({reason})", err.field_path())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> anyhow::Result<Cli> {
        Ok(Cli::try_parse_from(
            std::iter::once("wp-zip").chain(args.iter().copied()),
        )?)
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn short_flags_match_the_documented_surface() -> anyhow::Result<()> {
        let cli = parse(&[
            "-h",
            "ssh.example.com",
            "-u",
            "deploy",
            "-p",
            "hunter2",
            "-P",
            "2222",
            "-d",
            "https://example.com",
            "-w",
            "/var/www/html",
            "site.zip",
        ])?;
        let settings = cli.settings();
        assert_eq!(settings.connection.host, "ssh.example.com");
        assert_eq!(settings.connection.username, "deploy");
        assert_eq!(settings.connection.port, 2222);
        assert_eq!(
            settings.connection.password.as_ref().map(Secret::expose),
            Some("hunter2")
        );
        assert_eq!(settings.site.site_url.as_deref(), Some("https://example.com"));
        assert_eq!(settings.site.public_path.as_deref(), Some("/var/www/html"));
        assert_eq!(settings.archive.output, PathBuf::from("site.zip"));
        assert_eq!(settings.archive.partial, PartialArchive::Remove);
        Ok(())
    }

    #[test]
    fn optional_values_fall_back_to_defaults() -> anyhow::Result<()> {
        let cli = parse(&["--host", "h", "--username", "u", "out.zip"])?;
        let settings = cli.settings();
        assert_eq!(settings.connection.port, 22);
        assert!(settings.connection.password.is_none());
        assert!(settings.site.site_url.is_none());
        assert_eq!(settings.timeouts.connect, Duration::from_secs(30));
        assert!(!cli.quiet);
        Ok(())
    }

    #[test]
    fn extra_flags_reach_the_settings() -> anyhow::Result<()> {
        let cli = parse(&[
            "-h",
            "h",
            "-u",
            "u",
            "--host-key",
            "SHA256:abc",
            "--connect-timeout",
            "5",
            "--http-timeout",
            "60",
            "--keep-partial",
            "--log-format",
            "json",
            "-q",
            "out.zip",
        ])?;
        let settings = cli.settings();
        assert_eq!(settings.connection.host_key.as_deref(), Some("SHA256:abc"));
        assert_eq!(settings.timeouts.connect, Duration::from_secs(5));
        assert_eq!(settings.timeouts.http, Duration::from_secs(60));
        assert_eq!(settings.archive.partial, PartialArchive::Keep);
        assert_eq!(cli.log_format, "json");
        assert!(cli.quiet);
        Ok(())
    }

    #[test]
    fn output_and_required_flags_are_enforced() {
        assert!(parse(&["-h", "h", "-u", "u"]).is_err());
        assert!(parse(&["-u", "u", "out.zip"]).is_err());
        assert!(parse(&["-h", "h", "-u", "u", "-P", "not-a-port", "out.zip"]).is_err());
    }

    #[test]
    fn supplied_site_values_are_parsed_up_front() -> anyhow::Result<()> {
        let mut settings = parse(&["-h", "h", "-u", "u", "-w", " /srv/site ", "out.zip"])?.settings();
        let request = site_request(&settings)?;
        assert_eq!(
            request.public_path.as_ref().map(PublicPath::as_str),
            Some("/srv/site")
        );
        assert!(request.site_url.is_none());

        settings.site.site_url = Some("::not a url".to_string());
        assert!(matches!(site_request(&settings), Err(CliError::Validation(_))));
        Ok(())
    }

    #[test]
    fn validation_messages_name_the_field() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = parse(&[
            "-h",
            "h",
            "-u",
            "u",
            dir.path().to_str().unwrap_or("."),
        ])?
        .settings();
        let message = match validate(&settings) {
            Err(err) => describe(&err),
            Ok(()) => anyhow::bail!("a directory is not a valid output"),
        };
        assert!(message.contains("archive.output"), "{message}");
        Ok(())
    }

    #[test]
    fn rejected_answers_exit_like_bad_flags() -> anyhow::Result<()> {
        let Err(source) = PublicPath::new("  ") else {
            anyhow::bail!("blank public path must be rejected");
        };
        let rejected = packaging_error(PackagerError::DetermineSiteInfo {
            source: Box::new(PackagerError::Validation {
                field: "public_path",
                source,
            }),
        });
        assert_eq!(rejected.exit_code(), 2);

        let missing = packaging_error(PackagerError::UtilityNotFound {
            utility: "mysqldump",
        });
        assert_eq!(missing.exit_code(), 3);
        Ok(())
    }
}
