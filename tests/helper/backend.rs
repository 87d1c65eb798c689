//! Backend test utilities

use std::collections::HashMap;

use async_trait::async_trait;

use version_checker::credentials::CredentialStore;
use version_checker::release::client::{
    Descriptor, GitHubApi, GitHubRelease, Manifest, RegistryApi,
};
use version_checker::release::error::BackendError;

/// GitHub backend answering from a fixed map of `owner/repo` to tag
pub struct StaticGitHub {
    releases: HashMap<String, String>,
}

impl StaticGitHub {
    pub fn new() -> Self {
        Self {
            releases: HashMap::new(),
        }
    }

    pub fn with_release(mut self, repository: &str, tag: &str) -> Self {
        self.releases
            .insert(repository.to_string(), tag.to_string());
        self
    }
}

#[async_trait]
impl GitHubApi for StaticGitHub {
    async fn latest_release(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<GitHubRelease, BackendError> {
        let repository = format!("{}/{}", owner, repo);
        match self.releases.get(&repository) {
            Some(tag) => Ok(GitHubRelease {
                tag_name: tag.clone(),
                published_at: None,
            }),
            None => Err(BackendError::NotFound(repository)),
        }
    }
}

/// Registry backend with fixed tags and one layer digest per tag
pub struct StaticRegistry {
    tags: HashMap<String, Vec<String>>,
    layers: HashMap<(String, String), String>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self {
            tags: HashMap::new(),
            layers: HashMap::new(),
        }
    }

    /// Registers `tags` in registry order, each with its layer digest
    pub fn with_tags(mut self, repository: &str, tags: &[(&str, &str)]) -> Self {
        self.tags.insert(
            repository.to_string(),
            tags.iter().map(|(tag, _)| tag.to_string()).collect(),
        );
        for (tag, digest) in tags {
            self.layers.insert(
                (repository.to_string(), tag.to_string()),
                digest.to_string(),
            );
        }
        self
    }
}

#[async_trait]
impl RegistryApi for StaticRegistry {
    async fn tags(&self, repository: &str) -> Result<Vec<String>, BackendError> {
        self.tags
            .get(repository)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(repository.to_string()))
    }

    async fn manifest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<Manifest, BackendError> {
        let digest = self
            .layers
            .get(&(repository.to_string(), reference.to_string()))
            .ok_or_else(|| BackendError::NotFound(format!("{}:{}", repository, reference)))?;

        Ok(Manifest {
            schema_version: 2,
            media_type: None,
            config: None,
            layers: vec![Descriptor {
                media_type: None,
                digest: digest.clone(),
                size: 0,
                platform: None,
            }],
            manifests: vec![],
            fs_layers: vec![],
            architecture: None,
        })
    }
}

/// Create a credential store bootstrapped from the given variables
pub fn credential_store(vars: &[(&str, &str)]) -> CredentialStore {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let store = CredentialStore::new();
    store.bootstrap_with(move |name| vars.get(name).cloned());
    store
}
