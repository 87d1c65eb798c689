//! GitHub Releases API client

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::USER_AGENT;
use crate::release::client::{GitHubApi, GitHubRelease};
use crate::release::error::BackendError;

/// Token-authenticated client for the GitHub REST API
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    /// Creates a new GitHubClient against `base_url` (no trailing slash)
    pub fn new(base_url: &str, token: &str) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl GitHubApi for GitHubClient {
    async fn latest_release(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<GitHubRelease, BackendError> {
        let url = format!("{}/repos/{}/{}/releases/latest", self.base_url, owner, repo);
        debug!("Fetching latest release: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(format!("{}/{}", owner, repo)));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized(format!("{}/{}", owner, repo)));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(BackendError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(BackendError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub release response: {}", e);
            BackendError::InvalidResponse(e.to_string())
        })
    }
}
