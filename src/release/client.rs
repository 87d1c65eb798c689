//! Backend capabilities consumed by release sources
//!
//! Sources never talk HTTP themselves: they hold an `Arc` to one of the
//! traits below, obtained from a [`ClientRegistry`] during bootstrap.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tracing::info;

use crate::config::EndpointsConfig;
use crate::credentials::{ContainerCredential, GitHubCredential};
use crate::release::clients::{GitHubClient, RegistryClient};
use crate::release::error::BackendError;

/// A release as returned by the GitHub "latest release" endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Trait for querying GitHub repository releases
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait GitHubApi: Send + Sync {
    /// Fetches the latest published release of `owner/repo`
    async fn latest_release(&self, owner: &str, repo: &str)
    -> Result<GitHubRelease, BackendError>;
}

/// Trait for querying a container registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RegistryApi: Send + Sync {
    /// Lists the tags of `repository` in registry order
    async fn tags(&self, repository: &str) -> Result<Vec<String>, BackendError>;

    /// Fetches the manifest `reference` (tag or digest) points at
    async fn manifest(&self, repository: &str, reference: &str)
    -> Result<Manifest, BackendError>;
}

/// Decoded image manifest
///
/// Covers Docker schema 2, OCI manifests and indexes, manifest lists and
/// schema 1. Only content-identifying fields are decoded, so signatures, the
/// tag name and build history never make two manifests differ.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub config: Option<Descriptor>,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
    #[serde(default)]
    pub manifests: Vec<Descriptor>,
    #[serde(default)]
    pub fs_layers: Vec<FsLayer>,
    #[serde(default)]
    pub architecture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub media_type: Option<String>,
    pub digest: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub platform: Option<Platform>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(default)]
    pub variant: Option<String>,
}

/// Schema 1 layer reference
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsLayer {
    pub blob_sum: String,
}

/// Per-kind cache of backend clients
///
/// Each client is created on first use with the credentials of the source
/// that asked for it, then shared by every later source of the same kind.
/// Tests preload clients with [`with_github_client`](Self::with_github_client)
/// and [`with_registry_client`](Self::with_registry_client).
pub struct ClientRegistry {
    endpoints: EndpointsConfig,
    github: OnceLock<Arc<dyn GitHubApi>>,
    registry: OnceLock<Arc<dyn RegistryApi>>,
}

impl ClientRegistry {
    pub fn new(endpoints: EndpointsConfig) -> Self {
        Self {
            endpoints,
            github: OnceLock::new(),
            registry: OnceLock::new(),
        }
    }

    /// Installs `client` as the GitHub client, replacing any earlier one
    pub fn with_github_client(mut self, client: Arc<dyn GitHubApi>) -> Self {
        self.github = OnceLock::from(client);
        self
    }

    /// Installs `client` as the registry client, replacing any earlier one
    pub fn with_registry_client(mut self, client: Arc<dyn RegistryApi>) -> Self {
        self.registry = OnceLock::from(client);
        self
    }

    pub fn endpoints(&self) -> &EndpointsConfig {
        &self.endpoints
    }

    /// Returns the shared GitHub client, creating it on first use
    pub fn github_client(
        &self,
        credential: &GitHubCredential,
    ) -> Result<Arc<dyn GitHubApi>, BackendError> {
        if let Some(client) = self.github.get() {
            return Ok(Arc::clone(client));
        }

        info!("Creating GitHub client for {}", self.endpoints.github_api_url);
        let client: Arc<dyn GitHubApi> = Arc::new(GitHubClient::new(
            &self.endpoints.github_api_url,
            &credential.token,
        )?);
        Ok(Arc::clone(self.github.get_or_init(|| client)))
    }

    /// Returns the shared registry client, creating it on first use
    pub fn registry_client(
        &self,
        credential: &ContainerCredential,
    ) -> Result<Arc<dyn RegistryApi>, BackendError> {
        if let Some(client) = self.registry.get() {
            return Ok(Arc::clone(client));
        }

        info!("Creating registry client for {}", self.endpoints.registry_url);
        let client: Arc<dyn RegistryApi> = Arc::new(RegistryClient::new(
            &self.endpoints.registry_url,
            &credential.username,
            &credential.password,
        )?);
        Ok(Arc::clone(self.registry.get_or_init(|| client)))
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(EndpointsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoints() -> EndpointsConfig {
        EndpointsConfig {
            github_api_url: "http://127.0.0.1:1".to_string(),
            registry_url: "http://127.0.0.1:1".to_string(),
        }
    }

    #[test]
    fn github_client_is_created_once_and_shared() {
        let registry = ClientRegistry::new(endpoints());

        let first = registry
            .github_client(&GitHubCredential::new("tok"))
            .unwrap();
        let second = registry
            .github_client(&GitHubCredential::new("other"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn registry_client_is_created_once_and_shared() {
        let registry = ClientRegistry::new(endpoints());
        let credential = ContainerCredential::new("docker", "secret");

        let first = registry.registry_client(&credential).unwrap();
        let second = registry.registry_client(&credential).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn registry_client_rejects_invalid_registry_url() {
        let registry = ClientRegistry::new(EndpointsConfig {
            registry_url: "not a url".to_string(),
            ..endpoints()
        });

        let result = registry.registry_client(&ContainerCredential::new("docker", "secret"));

        assert!(matches!(result, Err(BackendError::InvalidUrl(_))));
    }

    #[test]
    fn preloaded_client_is_returned_as_is() {
        let mock: Arc<dyn GitHubApi> = Arc::new(MockGitHubApi::new());
        let registry = ClientRegistry::new(endpoints()).with_github_client(Arc::clone(&mock));

        let client = registry
            .github_client(&GitHubCredential::new("tok"))
            .unwrap();

        assert!(Arc::ptr_eq(&client, &mock));
    }

    #[test]
    fn later_preload_replaces_earlier_one() {
        let first: Arc<dyn RegistryApi> = Arc::new(MockRegistryApi::new());
        let second: Arc<dyn RegistryApi> = Arc::new(MockRegistryApi::new());
        let registry = ClientRegistry::new(endpoints())
            .with_registry_client(Arc::clone(&first))
            .with_registry_client(Arc::clone(&second));

        let client = registry
            .registry_client(&ContainerCredential::new("docker", "secret"))
            .unwrap();

        assert!(Arc::ptr_eq(&client, &second));
        assert!(!Arc::ptr_eq(&client, &first));
    }

    #[test]
    fn manifest_equality_ignores_signatures_and_tag() {
        let a: Manifest = serde_json::from_value(json!({
            "schemaVersion": 1,
            "name": "library/app",
            "tag": "1.0",
            "architecture": "amd64",
            "fsLayers": [{ "blobSum": "sha256:aaa" }],
            "signatures": [{ "signature": "first" }]
        }))
        .unwrap();
        let b: Manifest = serde_json::from_value(json!({
            "schemaVersion": 1,
            "name": "library/app",
            "tag": "latest",
            "architecture": "amd64",
            "fsLayers": [{ "blobSum": "sha256:aaa" }],
            "signatures": [{ "signature": "second" }]
        }))
        .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn manifest_with_different_layers_is_not_equal() {
        let base = json!({
            "schemaVersion": 2,
            "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
            "config": { "digest": "sha256:cfg", "size": 10 },
            "layers": [{ "digest": "sha256:aaa", "size": 100 }]
        });
        let mut changed = base.clone();
        changed["layers"][0]["digest"] = json!("sha256:bbb");

        let a: Manifest = serde_json::from_value(base).unwrap();
        let b: Manifest = serde_json::from_value(changed).unwrap();

        assert_ne!(a, b);
    }
}
