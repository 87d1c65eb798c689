//! GitHub release source

use std::sync::Arc;

use tracing::{info, warn};

use crate::credentials::{CredentialStore, Credentials};
use crate::release::client::{ClientRegistry, GitHubApi};
use crate::release::error::ReleaseError;
use crate::release::source::ReleaseSource;
use crate::release::types::{ReleaseKind, Version};

/// Tracks the latest published release of a GitHub repository
///
/// The release tag name becomes the version as-is, without stripping a `v`
/// prefix or any other normalization.
pub struct GitHubReleaseSource {
    kind: ReleaseKind,
    current: Version,
    org: String,
    repo: String,
    clients: Arc<ClientRegistry>,
    client: Option<Arc<dyn GitHubApi>>,
}

impl GitHubReleaseSource {
    pub fn new(
        org: impl Into<String>,
        repo: impl Into<String>,
        current: impl Into<Version>,
        clients: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            kind: ReleaseKind::GITHUB,
            current: current.into(),
            org: org.into(),
            repo: repo.into(),
            clients,
            client: None,
        }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn client(&self) -> Result<&Arc<dyn GitHubApi>, ReleaseError> {
        self.client
            .as_ref()
            .ok_or_else(|| ReleaseError::NotBootstrapped(self.kind.clone()))
    }
}

#[async_trait::async_trait]
impl ReleaseSource for GitHubReleaseSource {
    fn kind(&self) -> &ReleaseKind {
        &self.kind
    }

    fn current_version(&self) -> &Version {
        &self.current
    }

    fn bootstrap(&mut self, credentials: &CredentialStore) -> Result<(), ReleaseError> {
        let snapshot = credentials.get();
        let Some(credential) = snapshot.as_ref().and_then(Credentials::usable_github) else {
            warn!("GitHub token is not set, cannot bootstrap {}/{}", self.org, self.repo);
            return Err(ReleaseError::CredentialMissing(self.kind.clone()));
        };

        self.client = Some(self.clients.github_client(credential)?);
        info!("Bootstrapped GitHub source {}/{}", self.org, self.repo);
        Ok(())
    }

    async fn latest_version(&self) -> Result<Version, ReleaseError> {
        let release = self
            .client()?
            .latest_release(&self.org, &self.repo)
            .await?;

        Ok(match release.published_at {
            Some(published_at) => Version::observed(release.tag_name, published_at),
            None => Version::new(release.tag_name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointsConfig, GITHUB_TOKEN_ENV};
    use crate::release::client::{GitHubRelease, MockGitHubApi};
    use crate::release::error::BackendError;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn store_with_token(token: &str) -> CredentialStore {
        let token = token.to_string();
        let store = CredentialStore::new();
        store.bootstrap_with(move |name| (name == GITHUB_TOKEN_ENV).then(|| token.clone()));
        store
    }

    fn release(tag: &str) -> GitHubRelease {
        GitHubRelease {
            tag_name: tag.to_string(),
            published_at: None,
        }
    }

    fn source_with(current: &str, mock: MockGitHubApi) -> GitHubReleaseSource {
        let clients = ClientRegistry::new(EndpointsConfig::default())
            .with_github_client(Arc::new(mock));
        GitHubReleaseSource::new("o", "r", current, Arc::new(clients))
    }

    fn bootstrapped(current: &str, mock: MockGitHubApi) -> GitHubReleaseSource {
        let mut source = source_with(current, mock);
        source.bootstrap(&store_with_token("tok")).unwrap();
        source
    }

    #[test]
    fn new_records_kind_location_and_version() {
        let source = source_with("beta", MockGitHubApi::new());

        assert_eq!(source.kind(), &ReleaseKind::GITHUB);
        assert_eq!(source.current_version(), &Version::new("beta"));
        assert_eq!((source.org(), source.repo()), ("o", "r"));
    }

    #[rstest]
    #[case(ReleaseKind::GITHUB, true)]
    #[case(ReleaseKind::new("gitlab"), false)]
    #[case(ReleaseKind::CONTAINER_REGISTRY, false)]
    fn is_kind_matches_github_only(#[case] kind: ReleaseKind, #[case] expected: bool) {
        let source = source_with("beta", MockGitHubApi::new());

        assert_eq!(source.is_kind(&kind), expected);
    }

    #[test]
    fn bootstrap_fails_when_store_was_never_bootstrapped() {
        let mut source = source_with("0.0.1", MockGitHubApi::new());

        let result = source.bootstrap(&CredentialStore::new());

        assert!(matches!(
            result,
            Err(ReleaseError::CredentialMissing(kind)) if kind == ReleaseKind::GITHUB
        ));
    }

    #[test]
    fn bootstrap_fails_with_empty_token() {
        let mut source = source_with("0.0.1", MockGitHubApi::new());

        let result = source.bootstrap(&store_with_token(""));

        assert!(matches!(result, Err(ReleaseError::CredentialMissing(_))));
    }

    #[tokio::test]
    async fn latest_version_fails_before_bootstrap() {
        let source = source_with("0.0.1", MockGitHubApi::new());

        let result = source.latest_version().await;

        assert!(matches!(result, Err(ReleaseError::NotBootstrapped(_))));
    }

    #[tokio::test]
    async fn failed_bootstrap_keeps_previously_attached_client() {
        let mut mock = MockGitHubApi::new();
        mock.expect_latest_release()
            .times(1)
            .returning(|_, _| Ok(release("0.0.2")));

        let mut source = bootstrapped("0.0.1", mock);
        let emptied = CredentialStore::new();
        emptied.bootstrap_with(|_| None);

        let result = source.bootstrap(&emptied);
        assert!(matches!(result, Err(ReleaseError::CredentialMissing(_))));

        let latest = source.latest_version().await.unwrap();
        assert_eq!(latest, Version::new("0.0.2"));
    }

    #[tokio::test]
    async fn latest_version_maps_tag_and_publish_date() {
        let published_at = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let mut mock = MockGitHubApi::new();
        mock.expect_latest_release()
            .withf(|owner, repo| owner == "o" && repo == "r")
            .times(1)
            .returning(move |_, _| {
                Ok(GitHubRelease {
                    tag_name: "v1.2.0".to_string(),
                    published_at: Some(published_at),
                })
            });

        let source = bootstrapped("0.0.1", mock);
        let latest = source.latest_version().await.unwrap();

        assert_eq!(latest.value(), "v1.2.0");
        assert_eq!(latest.observed_at(), Some(published_at));
    }

    #[rstest]
    #[case("0.0.1", "0.0.2", true)]
    #[case("0.0.1", "0.0.1", false)]
    #[case("1.2.0", "v1.2.0", true)]
    #[tokio::test]
    async fn has_new_version_compares_latest_tag_with_current(
        #[case] current: &str,
        #[case] latest: &'static str,
        #[case] expected: bool,
    ) {
        let mut mock = MockGitHubApi::new();
        mock.expect_latest_release()
            .times(1)
            .returning(move |_, _| Ok(release(latest)));

        let source = bootstrapped(current, mock);
        let result = source.has_new_version().await.unwrap();

        assert_eq!(result.latest, Version::new(latest));
        assert_eq!(result.is_newer, expected);
    }

    #[tokio::test]
    async fn has_new_version_propagates_backend_error() {
        let mut mock = MockGitHubApi::new();
        mock.expect_latest_release()
            .times(1)
            .returning(|_, _| Err(BackendError::NotFound("o/r".to_string())));

        let source = bootstrapped("0.0.1", mock);
        let result = source.has_new_version().await;

        assert!(matches!(
            result,
            Err(ReleaseError::Upstream(BackendError::NotFound(_)))
        ));
    }
}
