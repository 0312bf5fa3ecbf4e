//! Generated PHP scripts uploaded to the webroot and fetched over HTTP.

use wpzip_core::{DatabaseCredentials, HostSpec, PublicPath, SiteUrl};

/// Single-quoted PHP string literal.
pub(crate) fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', r"\\").replace('\'', r"\'"))
}

/// PDO data source name for the credentials' host, port, or socket.
pub(crate) fn pdo_dsn(credentials: &DatabaseCredentials) -> String {
    let HostSpec { host, port, socket } = credentials.host_spec();
    let mut dsn = match socket {
        Some(socket) => format!("mysql:unix_socket={socket}"),
        None => format!("mysql:host={host}"),
    };
    if let Some(port) = port {
        dsn.push_str(&format!(";port={port}"));
    }
    dsn.push_str(&format!(";dbname={}", credentials.name));
    dsn
}

/// `host, user, pass, name, port, socket` arguments for `mysqli_connect`.
fn mysqli_arguments(credentials: &DatabaseCredentials) -> String {
    let HostSpec { host, port, socket } = credentials.host_spec();
    format!(
        "{}, {}, {}, {}, {}, {}",
        literal(&host),
        literal(&credentials.user),
        literal(&credentials.pass),
        literal(&credentials.name),
        port.map_or_else(|| "null".to_string(), |port| port.to_string()),
        socket.map_or_else(|| "null".to_string(), |socket| literal(&socket)),
    )
}

/// Script that streams a full dump using the bundled dumper next to it.
pub(crate) fn dump_invoker_script(credentials: &DatabaseCredentials, dumper: &str) -> String {
    format!(
        r"<?php

include_once(__DIR__ . '/{dumper}');
$dump = new WpZip\Mysqldump({dsn}, {user}, {pass});
header('Content-Type: application/sql');
$dump->start('php://output');
",
        dsn = literal(&pdo_dsn(credentials)),
        user = literal(&credentials.user),
        pass = literal(&credentials.pass),
    )
}

/// Script that reports site and service versions as JSON.
pub(crate) fn metadata_script(
    credentials: &DatabaseCredentials,
    site_url: &SiteUrl,
    public_path: &PublicPath,
) -> String {
    let domain = literal(site_url.domain());
    format!(
        r"<?php

$link = mysqli_connect({connect});
$mysqlVersion = mysqli_get_server_info($link);
mysqli_close($link);

preg_match('/^(apache|nginx)\/(\d+\.\d+\.\d+).*/', strtolower($_SERVER['SERVER_SOFTWARE'] ?? ''), $matches);
$serverJson = isset($matches[1], $matches[2]) ? [ $matches[1] => [ 'name' => $matches[1], 'version' => $matches[2] ] ] : [];

$wpVersionFile = file_get_contents(__DIR__ . DIRECTORY_SEPARATOR . 'wp-includes' . DIRECTORY_SEPARATOR . 'version.php');
preg_match('/\$wp_version = \'(.*)\';/', $wpVersionFile, $matches);
$wpVersion = isset($matches[1]) ? $matches[1] : '';

header('Content-Type: application/json');
echo json_encode(array_merge_recursive([
    'name' => {domain},
    'domain' => {domain},
    'path' => {path},
    'wpVersion' => $wpVersion,
    'services' => [
        'php' => [
            'name' => 'php',
            'version' => PHP_VERSION,
        ],
        'mysql' => [
            'name' => 'mysql',
            'version' => $mysqlVersion,
        ],
    ],
], ['services' => $serverJson]));
",
        connect = mysqli_arguments(credentials),
        path = literal(&public_path.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(host: &str) -> DatabaseCredentials {
        DatabaseCredentials::new("wp", r"p'a\ss", "wordpress", Some(host.to_string()))
    }

    #[test]
    fn literals_escape_quotes_and_backslashes() {
        assert_eq!(literal("plain"), "'plain'");
        assert_eq!(literal("it's"), r"'it\'s'");
        assert_eq!(literal(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn dsn_follows_host_spec() {
        assert_eq!(
            pdo_dsn(&credentials("localhost")),
            "mysql:host=localhost;dbname=wordpress"
        );
        assert_eq!(
            pdo_dsn(&credentials("db.internal:3307")),
            "mysql:host=db.internal;port=3307;dbname=wordpress"
        );
        assert_eq!(
            pdo_dsn(&credentials("localhost:/run/mysqld/mysqld.sock")),
            "mysql:unix_socket=/run/mysqld/mysqld.sock;dbname=wordpress"
        );
    }

    #[test]
    fn invoker_streams_to_output() {
        let script = dump_invoker_script(&credentials("localhost"), "Mysqldump.php");
        assert!(script.contains("include_once(__DIR__ . '/Mysqldump.php');"));
        assert!(script.contains(r"'wp', 'p\'a\\ss'"));
        assert!(script.contains("$dump->start('php://output');"));
    }

    #[test]
    fn metadata_script_embeds_site_and_connection() -> anyhow::Result<()> {
        let site = SiteUrl::parse("https://example.com/")?;
        let path = PublicPath::new("/var/www/html")?;
        let script = metadata_script(&credentials("db:3307"), &site, &path);

        assert!(script.contains(r"mysqli_connect('db', 'wp', 'p\'a\\ss', 'wordpress', 3307, null);"));
        assert!(script.contains("'name' => 'example.com',"));
        assert!(script.contains("'path' => '/var/www/html/',"));
        Ok(())
    }
}
