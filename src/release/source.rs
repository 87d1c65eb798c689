//! ReleaseSource trait implemented by every backend

use crate::credentials::CredentialStore;
use crate::release::checker::check_version;
use crate::release::error::ReleaseError;
use crate::release::types::{ReleaseKind, Version, VersionCheck};

/// A backend-specific provider of "the latest version of this artifact"
///
/// Sources are built with what the caller already knows (kind, location,
/// current version) and only become usable after [`bootstrap`](Self::bootstrap)
/// has resolved credentials and attached a backend client.
#[async_trait::async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Returns the kind of this source
    fn kind(&self) -> &ReleaseKind;

    /// Returns the version recorded when the source was built
    fn current_version(&self) -> &Version;

    fn is_kind(&self, kind: &ReleaseKind) -> bool {
        self.kind() == kind
    }

    /// Resolves the credentials for this kind and attaches a backend client
    ///
    /// Fails with [`ReleaseError::CredentialMissing`] when the bundle is absent
    /// or incomplete. Calling it again re-validates and re-attaches.
    fn bootstrap(&mut self, credentials: &CredentialStore) -> Result<(), ReleaseError>;

    /// Fetches the authoritative latest version from the backend
    async fn latest_version(&self) -> Result<Version, ReleaseError>;

    /// Fetches the latest version and reports whether it differs from the current one
    async fn has_new_version(&self) -> Result<VersionCheck, ReleaseError> {
        let latest = self.latest_version().await?;
        Ok(check_version(self.current_version(), latest))
    }
}
