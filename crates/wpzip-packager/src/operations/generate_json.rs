use std::io::Read;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};
use wpzip_core::{FileUploadDeleter, HttpGetter, NameGenerator, SiteInfo};

use super::{METADATA_ENTRY, Operation};
use crate::emitter::FileCallback;
use crate::error::{PackagerError, PackagerResult};
use crate::http::fetch_site_path;
use crate::php;
use crate::scratch::ScratchFiles;

const REQUIRED_KEY: &str = "name";

/// Generates `wpmigrate-export.json` by running a one-off script on the site.
pub struct GenerateJson {
    uploader: Arc<dyn FileUploadDeleter>,
    http: Arc<dyn HttpGetter>,
    names: Arc<dyn NameGenerator>,
    site: SiteInfo,
}

impl GenerateJson {
    /// Operation describing `site`.
    #[must_use]
    pub fn new(
        uploader: Arc<dyn FileUploadDeleter>,
        http: Arc<dyn HttpGetter>,
        names: Arc<dyn NameGenerator>,
        site: SiteInfo,
    ) -> Self {
        Self {
            uploader,
            http,
            names,
            site,
        }
    }

    fn fetch(&self, scratch: &mut ScratchFiles, script_name: &str) -> PackagerResult<String> {
        let script = php::metadata_script(
            &self.site.credentials,
            &self.site.site_url,
            &self.site.public_path,
        );
        scratch.upload(&mut script.as_bytes(), &self.site.public_path.join(script_name))?;

        let mut body = fetch_site_path(self.http.as_ref(), &self.site.site_url, script_name)?;
        let mut contents = String::new();
        body.read_to_string(&mut contents)
            .map_err(|source| PackagerError::io("generate_json.read", script_name, source))?;
        validate(&contents)?;
        Ok(contents)
    }
}

fn validate(contents: &str) -> PackagerResult<()> {
    let document: Map<String, Value> =
        serde_json::from_str(contents).map_err(|err| {
            debug!(error = %err, "metadata response is not a json object");
            PackagerError::UnexpectedResponse {
                reason: "malformed_json",
            }
        })?;
    if document.contains_key(REQUIRED_KEY) {
        Ok(())
    } else {
        Err(PackagerError::UnexpectedResponse {
            reason: "missing_name",
        })
    }
}

impl Operation for GenerateJson {
    fn name(&self) -> &'static str {
        "generate_json"
    }

    fn send_files(&self, callback: &mut FileCallback<'_>) -> PackagerResult<()> {
        let script_name = format!("wp-zip-{}.php", self.names.token());
        let mut scratch = ScratchFiles::new(Arc::clone(&self.uploader));

        let outcome = self.fetch(&mut scratch, &script_name);
        let contents = scratch.finish(outcome)?;
        info!(bytes = contents.len(), "site metadata generated");
        callback(METADATA_ENTRY, &mut contents.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpzip_core::{DatabaseCredentials, PublicPath, SiteUrl};
    use wpzip_test_support::mocks::{FakeHttpGetter, FakeRemoteHost, FixedNames};

    const SCRIPT: &str = "/var/www/wp-zip-tok.php";
    const SECURE: &str = "https://example.com/wp-zip-tok.php";
    const INSECURE: &str = "http://example.com/wp-zip-tok.php";
    const DOCUMENT: &str = r#"{"name":"example.com","domain":"example.com","path":"/var/www/"}"#;

    fn operation(host: &Arc<FakeRemoteHost>, http: FakeHttpGetter) -> anyhow::Result<GenerateJson> {
        Ok(GenerateJson::new(
            host.clone(),
            Arc::new(http),
            Arc::new(FixedNames::new("tok")),
            SiteInfo {
                site_url: SiteUrl::parse("https://example.com")?,
                public_path: PublicPath::new("/var/www")?,
                credentials: DatabaseCredentials::new("user", "pass", "db", None),
                table_prefix: "wp_".to_string(),
            },
        ))
    }

    fn collect(operation: &GenerateJson) -> PackagerResult<Vec<(String, String)>> {
        let mut entries = Vec::new();
        operation.send_files(&mut |name, reader| {
            let mut body = String::new();
            reader
                .read_to_string(&mut body)
                .map_err(|source| PackagerError::io("test.read", name, source))?;
            entries.push((name.to_string(), body));
            Ok(())
        })?;
        Ok(entries)
    }

    #[test]
    fn metadata_is_stored_verbatim_and_script_removed() -> anyhow::Result<()> {
        let host = Arc::new(FakeRemoteHost::new());
        let operation = operation(&host, FakeHttpGetter::new().with_body(SECURE, DOCUMENT))?;

        let entries = collect(&operation)?;
        assert_eq!(entries, vec![(METADATA_ENTRY.to_string(), DOCUMENT.to_string())]);
        assert_eq!(host.deletes(), vec![SCRIPT]);
        assert_eq!(host.uploads()[0].0, SCRIPT);
        Ok(())
    }

    #[test]
    fn insecure_fallback_is_used_when_https_fails() -> anyhow::Result<()> {
        let host = Arc::new(FakeRemoteHost::new());
        let http = FakeHttpGetter::new()
            .with_status(SECURE, 525)
            .with_body(INSECURE, DOCUMENT);
        let entries = collect(&operation(&host, http)?)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(host.deletes(), vec![SCRIPT]);
        Ok(())
    }

    #[test]
    fn every_fetch_outcome_removes_the_script_exactly_once() -> anyhow::Result<()> {
        // `None` expects a transport failure, `Some(reason)` a rejected body.
        let outcomes = [
            (FakeHttpGetter::new(), None),
            (
                FakeHttpGetter::new().with_body(SECURE, "<html>"),
                Some("malformed_json"),
            ),
            (
                FakeHttpGetter::new().with_body(SECURE, r#"{"domain":"x"}"#),
                Some("missing_name"),
            ),
        ];

        for (http, expected) in outcomes {
            let host = Arc::new(FakeRemoteHost::new());
            let mut called = false;
            let result = operation(&host, http)?.send_files(&mut |_, _| {
                called = true;
                Ok(())
            });
            match (result, expected) {
                (Err(PackagerError::InvalidResponse { .. }), None) => {}
                (Err(PackagerError::UnexpectedResponse { reason }), Some(expected)) => {
                    assert_eq!(reason, expected);
                }
                (other, _) => anyhow::bail!("unexpected outcome {other:?}"),
            }
            assert!(!called);
            assert_eq!(host.deletes(), vec![SCRIPT]);
        }
        Ok(())
    }

    #[test]
    fn failed_delete_is_surfaced_after_success() -> anyhow::Result<()> {
        let host = Arc::new(FakeRemoteHost::new().failing_delete(SCRIPT));
        let operation = operation(&host, FakeHttpGetter::new().with_body(SECURE, DOCUMENT))?;

        assert!(matches!(
            collect(&operation),
            Err(PackagerError::Cleanup { primary: None, .. })
        ));
        Ok(())
    }

    #[test]
    fn failed_upload_is_reported_and_cleaned() -> anyhow::Result<()> {
        let host = Arc::new(FakeRemoteHost::new().failing_upload(SCRIPT));
        let operation = operation(&host, FakeHttpGetter::new().with_body(SECURE, DOCUMENT))?;

        assert!(matches!(
            collect(&operation),
            Err(PackagerError::UploadFailed { .. })
        ));
        assert_eq!(host.deletes(), vec![SCRIPT]);
        Ok(())
    }
}
