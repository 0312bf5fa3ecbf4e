//! Site discovery: public path, database credentials, and site URL.
//!
//! # Design
//! - Each missing value is discovered remotely first and prompted for second.
//! - Ambiguous discovery (several `wp-config.php` files) counts as a miss.
//! - Parsing `wp-config.php` is mandatory; its failure aborts resolution.

use std::io::Read;

use tracing::{debug, info, warn};
use wpzip_core::{Prompter, PublicPath, RemoteCommandRunner, SiteInfo, SiteUrl};

use crate::database::{mysql_credentials, redact};
use crate::error::{PackagerError, PackagerResult};
use crate::wpconfig::{WpConfigFields, WpConfigParser};

/// Remote search for configuration files below the login directory.
pub const FIND_WP_CONFIG: &str = "find -L . -type f -name 'wp-config.php'";

const WP_CONFIG_SUFFIX: &str = "/wp-config.php";
const PUBLIC_PATH_QUESTION: &str = "What is the public path?";
const SITE_URL_QUESTION: &str = "What is the site url?";
const MAX_PROMPT_ATTEMPTS: usize = 3;

/// Resolve everything the operations need, discovering or prompting for
/// whichever of `site_url` and `public_path` was not supplied.
///
/// # Errors
///
/// Returns [`PackagerError::ParseWpConfig`] when the configuration cannot be
/// read, [`PackagerError::Validation`] when a prompted value is invalid, and
/// [`PackagerError::Prompt`] when the operator cannot be asked.
pub fn determine_site_info(
    site_url: Option<SiteUrl>,
    public_path: Option<PublicPath>,
    parser: &dyn WpConfigParser,
    runner: &dyn RemoteCommandRunner,
    prompter: &dyn Prompter,
) -> PackagerResult<SiteInfo> {
    let public_path = match public_path {
        Some(path) => path,
        None => determine_public_path(runner, prompter)?,
    };
    info!(public_path = %public_path, "using public path");

    let fields = parser
        .parse_wp_config(&public_path)
        .map_err(|source| PackagerError::ParseWpConfig {
            source: Box::new(source),
        })?;

    let site_url = match site_url {
        Some(url) => url,
        None => determine_site_url(&fields, runner, prompter)?,
    };
    info!(site_url = %site_url, "using site url");

    Ok(SiteInfo {
        site_url,
        public_path,
        credentials: fields.credentials,
        table_prefix: fields.table_prefix,
    })
}

fn determine_public_path(
    runner: &dyn RemoteCommandRunner,
    prompter: &dyn Prompter,
) -> PackagerResult<PublicPath> {
    if let Some(found) = search_public_path(runner) {
        return Ok(found);
    }

    let answer = ask(prompter, PUBLIC_PATH_QUESTION)?;
    PublicPath::new(answer).map_err(|source| PackagerError::Validation {
        field: "public_path",
        source,
    })
}

fn search_public_path(runner: &dyn RemoteCommandRunner) -> Option<PublicPath> {
    if !runner.can_run(FIND_WP_CONFIG) {
        debug!("remote find unavailable");
        return None;
    }
    let output = match read_output(runner, FIND_WP_CONFIG) {
        Ok(output) => output,
        Err(err) => {
            warn!(error = %err, "wp-config search failed");
            return None;
        }
    };

    let matches: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    match matches.as_slice() {
        [single] => {
            let directory = single.strip_suffix(WP_CONFIG_SUFFIX).unwrap_or(*single);
            PublicPath::new(directory).ok()
        }
        [] => {
            info!("no wp-config.php found");
            None
        }
        many => {
            info!(candidates = many.len(), "several wp-config.php files found");
            None
        }
    }
}

fn determine_site_url(
    fields: &WpConfigFields,
    runner: &dyn RemoteCommandRunner,
    prompter: &dyn Prompter,
) -> PackagerResult<SiteUrl> {
    if let Some(found) = query_site_url(fields, runner) {
        return Ok(found);
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        let answer = ask(prompter, SITE_URL_QUESTION)?;
        match SiteUrl::parse(&answer) {
            Ok(url) => return Ok(url),
            Err(source) if attempt >= MAX_PROMPT_ATTEMPTS => {
                return Err(PackagerError::Validation {
                    field: "site_url",
                    source,
                });
            }
            Err(err) => warn!(error = %err, attempt, "site url rejected"),
        }
    }
}

/// Command that prints the `siteurl` option using the site's own credentials.
pub(crate) fn site_url_query(fields: &WpConfigFields) -> String {
    format!(
        "mysql {} --skip-column-names --silent -e \"SELECT option_value FROM {}options WHERE option_name = 'siteurl';\"",
        mysql_credentials(&fields.credentials),
        fields.table_prefix
    )
}

fn query_site_url(fields: &WpConfigFields, runner: &dyn RemoteCommandRunner) -> Option<SiteUrl> {
    let command = site_url_query(fields);
    debug!(command = %redact(&command, &fields.credentials), "querying site url");
    if !runner.can_run(&command) {
        return None;
    }
    let output = match read_output(runner, &command) {
        Ok(output) => output,
        Err(err) => {
            warn!(error = %err, "site url query failed");
            return None;
        }
    };
    match SiteUrl::parse(output.trim()) {
        Ok(url) => Some(url),
        Err(err) => {
            warn!(error = %err, "site url query returned an unusable value");
            None
        }
    }
}

fn read_output(runner: &dyn RemoteCommandRunner, command: &str) -> std::io::Result<String> {
    let mut stream = runner
        .run(command)
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    let mut output = String::new();
    stream.read_to_string(&mut output)?;
    Ok(output)
}

fn ask(prompter: &dyn Prompter, question: &'static str) -> PackagerResult<String> {
    prompter
        .prompt(question)
        .map(|answer| answer.trim().to_string())
        .map_err(|source| PackagerError::Prompt { question, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wpzip_core::DatabaseCredentials;
    use wpzip_test_support::mocks::{FakeRemoteHost, ScriptedPrompter};

    struct StubParser {
        seen: Mutex<Vec<String>>,
        result: fn() -> PackagerResult<WpConfigFields>,
    }

    impl StubParser {
        fn ok() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                result: || Ok(fields()),
            }
        }

        fn failing() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                result: || Err(PackagerError::MissingWpConfigField { field: "DB_USER" }),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen
                .lock()
                .map(|seen| seen.clone())
                .unwrap_or_default()
        }
    }

    impl WpConfigParser for StubParser {
        fn parse_wp_config(&self, public_path: &PublicPath) -> PackagerResult<WpConfigFields> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(public_path.to_string());
            }
            (self.result)()
        }
    }

    fn fields() -> WpConfigFields {
        WpConfigFields {
            credentials: DatabaseCredentials::new("user", "pass", "db", None),
            table_prefix: "wp_".to_string(),
        }
    }

    fn query() -> String {
        site_url_query(&fields())
    }

    #[test]
    fn site_url_query_uses_prefix_and_quoted_credentials() {
        assert_eq!(
            query(),
            "mysql --user='user' --password='pass' --host=localhost db --skip-column-names --silent -e \"SELECT option_value FROM wp_options WHERE option_name = 'siteurl';\""
        );
    }

    #[test]
    fn site_url_is_read_from_the_database() -> anyhow::Result<()> {
        let host = FakeRemoteHost::new().with_command(&query(), "https://example.com/\n");
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        let info = determine_site_info(
            None,
            Some(PublicPath::new("/var/www")?),
            &StubParser::ok(),
            &host,
            &prompter,
        )?;

        assert_eq!(info.site_url.to_string(), "https://example.com");
        assert_eq!(info.table_prefix, "wp_");
        assert!(prompter.questions().is_empty());
        Ok(())
    }

    #[test]
    fn public_path_is_discovered_from_a_single_match() -> anyhow::Result<()> {
        let host = FakeRemoteHost::new().with_command(FIND_WP_CONFIG, "./public_html/wp-config.php\n");
        let parser = StubParser::ok();
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        let info = determine_site_info(
            Some(SiteUrl::parse("https://example.com")?),
            None,
            &parser,
            &host,
            &prompter,
        )?;

        assert_eq!(info.public_path.as_str(), "./public_html");
        assert_eq!(parser.seen(), vec!["./public_html/"]);
        Ok(())
    }

    #[test]
    fn ambiguous_matches_fall_back_to_the_prompt() -> anyhow::Result<()> {
        let host = FakeRemoteHost::new().with_command(
            FIND_WP_CONFIG,
            "./a/wp-config.php\n./b/wp-config.php\n",
        );
        let prompter = ScriptedPrompter::new(["/srv/b"]);
        let info = determine_site_info(
            Some(SiteUrl::parse("https://example.com")?),
            None,
            &StubParser::ok(),
            &host,
            &prompter,
        )?;

        assert_eq!(info.public_path.as_str(), "/srv/b");
        assert_eq!(prompter.questions(), vec![PUBLIC_PATH_QUESTION]);
        Ok(())
    }

    #[test]
    fn empty_public_path_answer_is_rejected() -> anyhow::Result<()> {
        let host = FakeRemoteHost::new();
        let prompter = ScriptedPrompter::new([""]);
        let result = determine_site_info(
            Some(SiteUrl::parse("https://example.com")?),
            None,
            &StubParser::ok(),
            &host,
            &prompter,
        );
        assert!(matches!(
            result,
            Err(PackagerError::Validation {
                field: "public_path",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn site_url_prompt_retries_until_valid() -> anyhow::Result<()> {
        let host = FakeRemoteHost::new().with_command(&query(), "\n");
        let prompter = ScriptedPrompter::new(["not a url", "example.com", "http://example.org/"]);
        let info = determine_site_info(
            None,
            Some(PublicPath::new("/var/www")?),
            &StubParser::ok(),
            &host,
            &prompter,
        )?;

        assert_eq!(info.site_url.to_string(), "http://example.org");
        assert_eq!(prompter.questions().len(), 3);
        Ok(())
    }

    #[test]
    fn site_url_prompt_gives_up_after_repeated_invalid_answers() -> anyhow::Result<()> {
        let host = FakeRemoteHost::new();
        let prompter = ScriptedPrompter::new(["a", "b", "c", "https://never.asked"]);
        let result = determine_site_info(
            None,
            Some(PublicPath::new("/var/www")?),
            &StubParser::ok(),
            &host,
            &prompter,
        );

        assert!(matches!(
            result,
            Err(PackagerError::Validation {
                field: "site_url",
                ..
            })
        ));
        assert_eq!(prompter.questions().len(), MAX_PROMPT_ATTEMPTS);
        Ok(())
    }

    #[test]
    fn parser_failures_abort_before_site_url_discovery() -> anyhow::Result<()> {
        let host = FakeRemoteHost::new();
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        let result = determine_site_info(
            None,
            Some(PublicPath::new("/var/www")?),
            &StubParser::failing(),
            &host,
            &prompter,
        );

        assert!(matches!(result, Err(PackagerError::ParseWpConfig { .. })));
        assert!(host.calls().is_empty());
        Ok(())
    }

    #[test]
    fn exhausted_prompter_is_a_prompt_error() -> anyhow::Result<()> {
        let host = FakeRemoteHost::new();
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        let result = determine_site_info(
            None,
            Some(PublicPath::new("/var/www")?),
            &StubParser::ok(),
            &host,
            &prompter,
        );
        assert!(matches!(
            result,
            Err(PackagerError::Prompt {
                question: SITE_URL_QUESTION,
                ..
            })
        ));
        Ok(())
    }
}
