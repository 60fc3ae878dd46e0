//! Release discovery against the GitHub releases API.

use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use serde::Deserialize;
use tracing::{debug, warn};

use super::config::{ProvisioningConfig, GITHUB_JSON_ACCEPT};
use crate::error::{PlaybackError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRelease {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    #[serde(default)]
    pub name: String,
    pub browser_download_url: String,
}

impl GithubRelease {
    /// Download URL of the asset whose URL ends in `archive_name`.
    pub fn archive_url(&self, archive_name: &str) -> Option<&str> {
        self.assets
            .iter()
            .map(|a| a.browser_download_url.as_str())
            .find(|url| url.ends_with(archive_name))
    }
}

/// Ask the release endpoint for the latest voice pack URL.
pub async fn resolve_archive_url(
    http: &dyn HttpClient,
    config: &ProvisioningConfig,
) -> Result<String> {
    let request = HttpRequest::get(&config.release_url).accept(GITHUB_JSON_ACCEPT);
    let response = http
        .execute_with_retry(request, RetryPolicy::default())
        .await
        .map_err(|e| PlaybackError::ReleaseDiscovery(e.to_string()))?;

    if !response.is_success() {
        warn!(status = response.status, url = %config.release_url, "Release lookup failed");
        return Err(PlaybackError::ReleaseDiscovery(format!(
            "HTTP {}",
            response.status
        )));
    }

    let release: GithubRelease = response
        .json()
        .map_err(|e| PlaybackError::ReleaseDiscovery(e.to_string()))?;

    let url = release
        .archive_url(&config.archive_name)
        .ok_or_else(|| {
            PlaybackError::ReleaseDiscovery(format!(
                "release has no {} asset",
                config.archive_name
            ))
        })?
        .to_string();

    debug!(tag = ?release.tag_name, %url, "Resolved voice pack release");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{DownloadStream, HttpResponse};
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait::async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn download_stream(&self, request: HttpRequest) -> BridgeResult<DownloadStream>;
        }
    }

    fn respond(status: u16, body: &'static str) -> MockHttp {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                req.url == ProvisioningConfig::default().release_url
                    && req.headers.get("Accept").map(String::as_str) == Some(GITHUB_JSON_ACCEPT)
            })
            .times(1)
            .returning(move |_| {
                Ok(HttpResponse {
                    status,
                    headers: HashMap::new(),
                    body: Bytes::from_static(body.as_bytes()),
                })
            });
        http
    }

    #[tokio::test]
    async fn resolves_latest_release() {
        let http = respond(
            200,
            r#"{"tag_name": "v9", "assets": [{"name": "voice_assets.zip", "browser_download_url": "https://dl/v9/voice_assets.zip"}]}"#,
        );
        let url = resolve_archive_url(&http, &ProvisioningConfig::default())
            .await
            .unwrap();
        assert_eq!(url, "https://dl/v9/voice_assets.zip");
    }

    #[tokio::test]
    async fn rejected_lookup_is_discovery_error() {
        let http = respond(403, r#"{"message": "rate limited"}"#);
        let err = resolve_archive_url(&http, &ProvisioningConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::ReleaseDiscovery(_)));
        assert_eq!(err.download_message(), "Could not resolve latest release");
    }

    #[tokio::test]
    async fn malformed_release_is_discovery_error() {
        let http = respond(200, "<html>");
        let err = resolve_archive_url(&http, &ProvisioningConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::ReleaseDiscovery(_)));
    }

    #[test]
    fn picks_archive_asset() {
        let release: GithubRelease = serde_json::from_str(
            r#"{
                "tag_name": "v3",
                "assets": [
                    {"name": "notes.txt", "browser_download_url": "https://dl/notes.txt"},
                    {"name": "voice_assets.zip", "browser_download_url": "https://dl/v3/voice_assets.zip"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(
            release.archive_url("voice_assets.zip"),
            Some("https://dl/v3/voice_assets.zip")
        );
        assert_eq!(release.archive_url("other.zip"), None);
    }

    #[test]
    fn tolerates_missing_fields() {
        let release: GithubRelease = serde_json::from_str("{}").unwrap();
        assert!(release.assets.is_empty());
        assert!(release.tag_name.is_none());
    }
}
