//! Container registry release source

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, Credentials};
use crate::release::checker::check_version;
use crate::release::client::{ClientRegistry, Manifest, RegistryApi};
use crate::release::error::ReleaseError;
use crate::release::source::ReleaseSource;
use crate::release::types::{ReleaseKind, TagComparison, Version, VersionCheck};

/// Tracks the tags of an image repository in a container registry
///
/// The latest tag is the first one the registry lists; tags are neither
/// sorted nor ranked. A latest tag that differs from the current one only
/// counts as new when the manifests behind the two tags differ, so a moving
/// alias pointing at the image already in use is not reported.
pub struct ContainerReleaseSource {
    kind: ReleaseKind,
    current: Version,
    repository: String,
    clients: Arc<ClientRegistry>,
    client: Option<Arc<dyn RegistryApi>>,
}

impl ContainerReleaseSource {
    pub fn new(
        repository: impl Into<String>,
        current: impl Into<Version>,
        clients: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            kind: ReleaseKind::CONTAINER_REGISTRY,
            current: current.into(),
            repository: repository.into(),
            clients,
            client: None,
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    fn client(&self) -> Result<&Arc<dyn RegistryApi>, ReleaseError> {
        self.client
            .as_ref()
            .ok_or_else(|| ReleaseError::NotBootstrapped(self.kind.clone()))
    }

    /// Lists the tags of `repository` in the order the registry returns them
    pub async fn get_tags(&self, repository: &str) -> Result<Vec<String>, ReleaseError> {
        let tags = self.client()?.tags(repository).await?;
        debug!("Registry listed {} tags for {}", tags.len(), repository);
        Ok(tags)
    }

    /// Picks the latest tag: the first one listed
    pub fn get_latest_tag(&self, tags: &[String]) -> Result<String, ReleaseError> {
        tags.first()
            .cloned()
            .ok_or_else(|| ReleaseError::EmptyTagList(self.repository.clone()))
    }

    pub async fn get_manifest(
        &self,
        repository: &str,
        tag: &str,
    ) -> Result<Manifest, ReleaseError> {
        Ok(self.client()?.manifest(repository, tag).await?)
    }

    /// Compares the image content behind two tags
    pub async fn compare_tags(
        &self,
        repository: &str,
        tag_a: &str,
        tag_b: &str,
    ) -> Result<TagComparison, ReleaseError> {
        let manifest_a = self.get_manifest(repository, tag_a).await?;
        let manifest_b = self.get_manifest(repository, tag_b).await?;

        if manifest_a == manifest_b {
            Ok(TagComparison::Equal)
        } else {
            Ok(TagComparison::Different)
        }
    }
}

#[async_trait::async_trait]
impl ReleaseSource for ContainerReleaseSource {
    fn kind(&self) -> &ReleaseKind {
        &self.kind
    }

    fn current_version(&self) -> &Version {
        &self.current
    }

    fn bootstrap(&mut self, credentials: &CredentialStore) -> Result<(), ReleaseError> {
        let snapshot = credentials.get();
        let Some(credential) = snapshot.as_ref().and_then(Credentials::usable_container) else {
            warn!(
                "Container registry credentials are not set, cannot bootstrap {}",
                self.repository
            );
            return Err(ReleaseError::CredentialMissing(self.kind.clone()));
        };

        self.client = Some(self.clients.registry_client(credential)?);
        info!("Bootstrapped container source {}", self.repository);
        Ok(())
    }

    async fn latest_version(&self) -> Result<Version, ReleaseError> {
        let tags = self.get_tags(&self.repository).await?;
        let latest = self.get_latest_tag(&tags)?;
        Ok(Version::new(latest))
    }

    async fn has_new_version(&self) -> Result<VersionCheck, ReleaseError> {
        let latest = self.latest_version().await?;
        let check = check_version(&self.current, latest);
        if !check.is_newer {
            return Ok(check);
        }

        let comparison = self
            .compare_tags(&self.repository, check.latest.value(), self.current.value())
            .await?;
        info!(
            "{}: latest tag {} vs current {}: {:?}",
            self.repository, check.latest, self.current, comparison
        );

        Ok(VersionCheck {
            is_newer: comparison == TagComparison::Different,
            ..check
        })
    }
}
