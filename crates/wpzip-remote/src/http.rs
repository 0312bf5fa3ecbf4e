//! Streaming HTTP GET for the site's web server.
//!
//! # Design
//! - The response body is never buffered: it is exposed as a blocking reader
//!   bridged from the response byte stream.
//! - Any non-2xx status is an error; callers decide whether to retry.

use std::io;
use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::Client;
use tokio::runtime;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::debug;
use wpzip_core::{HttpGetter, RemoteError, RemoteResult, RemoteStream};

const USER_AGENT: &str = concat!("wp-zip/", env!("CARGO_PKG_VERSION"));

/// Blocking [`HttpGetter`] backed by a shared `reqwest` client.
pub struct HttpFetcher {
    runtime: runtime::Handle,
    client: Client,
}

impl HttpFetcher {
    /// Fetcher whose requests run on `runtime` and expire after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`] when the client cannot be built.
    pub fn new(runtime: runtime::Handle, timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| RemoteError::transport("http.client", err))?;
        Ok(Self { runtime, client })
    }
}

impl HttpGetter for HttpFetcher {
    fn get(&self, url: &str) -> RemoteResult<RemoteStream> {
        let response = self
            .runtime
            .block_on(self.client.get(url).send())
            .map_err(|err| {
                if err.is_timeout() {
                    RemoteError::Timeout {
                        operation: "http.get",
                    }
                } else {
                    RemoteError::Http {
                        url: url.to_string(),
                        status: None,
                        source: Some(Box::new(err)),
                    }
                }
            })?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), "http response");
        if !status.is_success() {
            return Err(RemoteError::Http {
                url: url.to_string(),
                status: Some(status.as_u16()),
                source: None,
            });
        }

        let body = Box::pin(response.bytes_stream().map_err(io::Error::other));
        Ok(Box::new(SyncIoBridge::new_with_handle(
            StreamReader::new(body),
            self.runtime.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Read;

    fn fetcher() -> anyhow::Result<(tokio::runtime::Runtime, HttpFetcher)> {
        let runtime = tokio::runtime::Runtime::new()?;
        let fetcher = HttpFetcher::new(runtime.handle().clone(), Duration::from_secs(5))?;
        Ok((runtime, fetcher))
    }

    #[test]
    fn body_is_streamed_to_the_reader() -> anyhow::Result<()> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/wp-zip-abc.php")
                .header("user-agent", USER_AGENT);
            then.status(200).body(r#"{"name":"example.com"}"#);
        });
        let (_runtime, fetcher) = fetcher()?;

        let mut body = String::new();
        fetcher
            .get(&server.url("/wp-zip-abc.php"))?
            .read_to_string(&mut body)?;
        assert_eq!(body, r#"{"name":"example.com"}"#);
        mock.assert();
        Ok(())
    }

    #[test]
    fn error_statuses_are_reported() -> anyhow::Result<()> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.php");
            then.status(404);
        });
        let (_runtime, fetcher) = fetcher()?;

        let result = fetcher.get(&server.url("/missing.php"));
        assert!(matches!(
            result,
            Err(RemoteError::Http {
                status: Some(404),
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn unreachable_hosts_carry_the_client_error() -> anyhow::Result<()> {
        let (_runtime, fetcher) = fetcher()?;
        let result = fetcher.get("http://127.0.0.1:9/unreachable.php");
        assert!(matches!(
            result,
            Err(RemoteError::Http {
                status: None,
                source: Some(_),
                ..
            })
        ));
        Ok(())
    }
}
