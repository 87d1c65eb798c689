//! Release source implementations

pub mod container;
pub mod github;

pub use container::ContainerReleaseSource;
pub use github::GitHubReleaseSource;

use std::sync::Arc;

use crate::config::ReleaseConfig;
use crate::credentials::CredentialStore;
use crate::release::client::ClientRegistry;
use crate::release::error::ReleaseError;
use crate::release::source::ReleaseSource;
use crate::release::types::{ReleaseKind, Version, VersionCheck};

/// Any supported release source
pub enum Release {
    GitHub(GitHubReleaseSource),
    Container(ContainerReleaseSource),
}

impl Release {
    /// Builds the source matching `config.kind`
    pub fn from_config(
        config: &ReleaseConfig,
        clients: Arc<ClientRegistry>,
    ) -> Result<Self, ReleaseError> {
        let spec = &config.spec;

        if config.kind == ReleaseKind::GITHUB {
            Ok(Release::GitHub(GitHubReleaseSource::new(
                &spec.org,
                &spec.repo,
                config.current_version(),
                clients,
            )))
        } else if config.kind == ReleaseKind::CONTAINER_REGISTRY {
            Ok(Release::Container(ContainerReleaseSource::new(
                format!("{}/{}", spec.org, spec.repo),
                config.current_version(),
                clients,
            )))
        } else {
            Err(ReleaseError::UnsupportedKind(config.kind.clone()))
        }
    }

    fn source(&self) -> &dyn ReleaseSource {
        match self {
            Release::GitHub(source) => source,
            Release::Container(source) => source,
        }
    }

    fn source_mut(&mut self) -> &mut dyn ReleaseSource {
        match self {
            Release::GitHub(source) => source,
            Release::Container(source) => source,
        }
    }
}

#[async_trait::async_trait]
impl ReleaseSource for Release {
    fn kind(&self) -> &ReleaseKind {
        self.source().kind()
    }

    fn current_version(&self) -> &Version {
        self.source().current_version()
    }

    fn bootstrap(&mut self, credentials: &CredentialStore) -> Result<(), ReleaseError> {
        self.source_mut().bootstrap(credentials)
    }

    async fn latest_version(&self) -> Result<Version, ReleaseError> {
        self.source().latest_version().await
    }

    async fn has_new_version(&self) -> Result<VersionCheck, ReleaseError> {
        self.source().has_new_version().await
    }
}
