//! Docker Registry HTTP API v2 client

use std::sync::LazyLock;

use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, LINK, WWW_AUTHENTICATE};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::USER_AGENT;
use crate::release::client::{Manifest, RegistryApi};
use crate::release::error::BackendError;

/// Manifest media types accepted from the registry, most specific first
const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.docker.distribution.manifest.list.v2+json, \
     application/vnd.oci.image.manifest.v1+json, \
     application/vnd.oci.image.index.v1+json, \
     application/vnd.docker.distribution.manifest.v1+prettyjws";

static CHALLENGE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("valid challenge pattern"));

static NEXT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).expect("valid link pattern")
});

/// Response from the tags/list endpoint
#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Response from a token realm
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Parameters of a `WWW-Authenticate: Bearer ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
struct BearerChallenge {
    realm: String,
    service: Option<String>,
    scope: Option<String>,
}

impl BearerChallenge {
    fn parse(header: &str) -> Option<Self> {
        let (scheme, params) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut realm = None;
        let mut service = None;
        let mut scope = None;
        for captures in CHALLENGE_PARAM.captures_iter(params) {
            let value = captures[2].to_string();
            match &captures[1] {
                "realm" => realm = Some(value),
                "service" => service = Some(value),
                "scope" => scope = Some(value),
                _ => {}
            }
        }

        Some(Self {
            realm: realm?,
            service,
            scope,
        })
    }
}

/// Authenticated client for a container registry
///
/// Requests go out with basic auth. Registries that delegate to a token
/// service answer 401 with a bearer challenge; the client then exchanges its
/// credentials for a token at the advertised realm and reissues the request.
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl RegistryClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self, BackendError> {
        reqwest::Url::parse(base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    async fn get(&self, url: &str, accept: &str) -> Result<reqwest::Response, BackendError> {
        debug!("Registry request: {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(challenge) = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(BearerChallenge::parse)
        else {
            return Ok(response);
        };

        let token = self.fetch_token(&challenge).await?;

        Ok(self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .bearer_auth(token)
            .send()
            .await?)
    }

    /// Resolves a pagination link, which registries usually send as a bare path
    fn resolve(&self, link: &str) -> Result<String, BackendError> {
        reqwest::Url::parse(&self.base_url)
            .and_then(|base| base.join(link))
            .map(String::from)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", link, e)))
    }

    async fn fetch_token(&self, challenge: &BearerChallenge) -> Result<String, BackendError> {
        let mut params = Vec::new();
        if let Some(service) = &challenge.service {
            params.push(("service", service.as_str()));
        }
        if let Some(scope) = &challenge.scope {
            params.push(("scope", scope.as_str()));
        }

        let url = reqwest::Url::parse_with_params(&challenge.realm, &params)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", challenge.realm, e)))?;
        debug!("Requesting registry token from {}", challenge.realm);

        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Token realm {} returned status {}", challenge.realm, status);
            return Err(BackendError::Unauthorized(challenge.realm.clone()));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse registry token response: {}", e);
            BackendError::InvalidResponse(e.to_string())
        })?;

        body.token.or(body.access_token).ok_or_else(|| {
            BackendError::InvalidResponse("token response without a token".to_string())
        })
    }
}

/// Target of the `Link: <...>; rel="next"` header of a paginated response
fn next_link(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| NEXT_LINK.captures(v).map(|c| c[1].to_string()))
}

fn check_status(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, BackendError> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(BackendError::NotFound(what.to_string()));
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BackendError::Unauthorized(what.to_string()));
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
        warn!("Registry returned status {} for {}", status, what);
        return Err(BackendError::InvalidResponse(format!(
            "Unexpected status: {}",
            status
        )));
    }

    Ok(response)
}

#[async_trait::async_trait]
impl RegistryApi for RegistryClient {
    async fn tags(&self, repository: &str) -> Result<Vec<String>, BackendError> {
        let mut url = format!("{}/v2/{}/tags/list", self.base_url, repository);
        let mut tags = Vec::new();

        loop {
            let response = check_status(self.get(&url, "application/json").await?, repository)?;
            let next = next_link(&response);

            let list: TagList = response.json().await.map_err(|e| {
                warn!("Failed to parse tag list for {}: {}", repository, e);
                BackendError::InvalidResponse(e.to_string())
            })?;
            tags.extend(list.tags.unwrap_or_default());

            let Some(link) = next else {
                break;
            };
            let next_url = self.resolve(&link)?;
            if next_url == url {
                warn!("Tag list for {} links to itself, stopping", repository);
                break;
            }
            debug!("Following tag list page {}", next_url);
            url = next_url;
        }

        Ok(tags)
    }

    async fn manifest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<Manifest, BackendError> {
        let url = format!("{}/v2/{}/manifests/{}", self.base_url, repository, reference);
        let what = format!("{}:{}", repository, reference);

        let response = check_status(self.get(&url, MANIFEST_ACCEPT).await?, &what)?;

        // Schema 1 manifests are served as application/vnd...+prettyjws, so
        // decode from bytes instead of relying on the content type.
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            warn!("Failed to parse manifest for {}: {}", what, e);
            BackendError::InvalidResponse(e.to_string())
        })
    }
}
