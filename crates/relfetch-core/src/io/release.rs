//! Release metadata and asset retrieval.
//!
//! [`ReleaseSource`] is what the pipeline talks to; [`GithubClient`] is the
//! default implementation against the GitHub REST API.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, StatusCode, Url, header};
use relfetch_schema::{Release, ReleaseAsset};
use serde::Deserialize;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::Config;

const API_VERSION: &str = "2022-11-28";

#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Release not found: {0}")]
    NotFound(String),

    #[error("GitHub API rate limit exceeded for {0}")]
    RateLimited(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected response from {url} (HTTP {status})")]
    Status { url: String, status: StatusCode },
}

/// Source of release listings and asset bytes.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Newest published release of a repository.
    async fn latest_release(&self, owner: &str, project: &str) -> Result<Release, ReleaseError>;

    /// Release published under a specific tag.
    async fn release_by_tag(
        &self,
        owner: &str,
        project: &str,
        tag: &str,
    ) -> Result<Release, ReleaseError>;

    /// Write the asset's bytes to `dest`.
    async fn download_asset(&self, asset: &ReleaseAsset, dest: &Path) -> Result<(), ReleaseError>;
}

/// GitHub release metadata from the API.
#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    assets: Vec<GithubAsset>,
}

/// GitHub release asset. `url` is the API endpoint, which also serves
/// private repositories when asked for `application/octet-stream`.
#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    url: String,
}

impl From<GithubRelease> for Release {
    fn from(release: GithubRelease) -> Self {
        Self {
            tag_name: release.tag_name,
            assets: release
                .assets
                .into_iter()
                .map(|a| ReleaseAsset {
                    name: a.name,
                    url: a.url,
                })
                .collect(),
        }
    }
}

/// Release source for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(client: Client, api_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Build a client from process configuration.
    pub fn from_config(config: &Config) -> Result<Self, ReleaseError> {
        let client = Client::builder().user_agent(crate::USER_AGENT).build()?;
        Ok(Self::new(client, &config.api_url, config.token.clone()))
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(header::USER_AGENT, crate::USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// API URL with each segment percent-encoded, so tags containing `#`,
    /// `?` or `/` stay one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ReleaseError> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| ReleaseError::InvalidUrl(format!("{}: {e}", self.api_url)))?;
        url.path_segments_mut()
            .map_err(|()| ReleaseError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_release(&self, url: Url, what: String) -> Result<Release, ReleaseError> {
        debug!(%url, "Fetching GitHub release");

        let response = self
            .get(url.as_str())
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        let response = check_status(response, url.as_str(), &what)?;
        let release: GithubRelease = response.json().await?;
        debug!(tag = %release.tag_name, assets = release.assets.len(), "Release resolved");
        Ok(release.into())
    }
}

/// Map API failures onto typed errors.
fn check_status(
    response: reqwest::Response,
    url: &str,
    what: &str,
) -> Result<reqwest::Response, ReleaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let remaining_zero = response
        .headers()
        .get("x-ratelimit-remaining")
        .is_some_and(|v| v == "0");

    match status {
        StatusCode::NOT_FOUND => Err(ReleaseError::NotFound(what.to_string())),
        StatusCode::TOO_MANY_REQUESTS => Err(ReleaseError::RateLimited(what.to_string())),
        StatusCode::FORBIDDEN if remaining_zero => {
            Err(ReleaseError::RateLimited(what.to_string()))
        }
        _ => Err(ReleaseError::Status {
            url: url.to_string(),
            status,
        }),
    }
}

#[async_trait]
impl ReleaseSource for GithubClient {
    async fn latest_release(&self, owner: &str, project: &str) -> Result<Release, ReleaseError> {
        let url = self.endpoint(&["repos", owner, project, "releases", "latest"])?;
        self.fetch_release(url, format!("{owner}/{project}@latest"))
            .await
    }

    async fn release_by_tag(
        &self,
        owner: &str,
        project: &str,
        tag: &str,
    ) -> Result<Release, ReleaseError> {
        let url = self.endpoint(&["repos", owner, project, "releases", "tags", tag])?;
        self.fetch_release(url, format!("{owner}/{project}@{tag}"))
            .await
    }

    async fn download_asset(&self, asset: &ReleaseAsset, dest: &Path) -> Result<(), ReleaseError> {
        debug!(url = %asset.url, dest = %dest.display(), "Downloading GitHub asset");

        let response = self
            .get(&asset.url)
            .header(header::ACCEPT, "application/octet-stream")
            .send()
            .await?;
        let response = check_status(response, &asset.url, &asset.name)?;

        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await?;
        debug!(bytes = downloaded, name = %asset.name, "Download complete");
        Ok(())
    }
}
