use tracing::{debug, warn};
use wpzip_core::{HttpGetter, RemoteStream, SiteUrl};

use crate::error::{PackagerError, PackagerResult};

/// GET `path` under the site, secure URL first with one insecure retry.
pub(crate) fn fetch_site_path(
    http: &dyn HttpGetter,
    site_url: &SiteUrl,
    path: &str,
) -> PackagerResult<RemoteStream> {
    let secure = site_url.secure_url(path);
    debug!(url = %secure, "requesting remote script");
    match http.get(&secure) {
        Ok(body) => Ok(body),
        Err(err) => {
            let insecure = site_url.insecure_url(path);
            warn!(url = %secure, error = %err, retry = %insecure, "secure request failed");
            http.get(&insecure)
                .map_err(|source| PackagerError::InvalidResponse {
                    url: insecure,
                    source,
                })
        }
    }
}
