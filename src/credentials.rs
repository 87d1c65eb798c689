//! Credential bundles and their lifecycle
//!
//! A [`CredentialStore`] starts out empty ("absent"), is populated from the
//! environment by [`CredentialStore::bootstrap`], and can afterwards be
//! patched bundle by bundle or reset. Release sources read a snapshot of it
//! while bootstrapping.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{GITHUB_TOKEN_ENV, REGISTRY_PASSWORD_ENV, REGISTRY_USERNAME_ENV};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Credential store needs to be bootstrapped first")]
    NotBootstrapped,
}

/// Token used against the GitHub REST API
#[derive(Clone, Default, PartialEq, Eq)]
pub struct GitHubCredential {
    pub token: String,
}

impl GitHubCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns true when every required field is filled in
    pub fn is_complete(&self) -> bool {
        !self.token.is_empty()
    }
}

impl fmt::Debug for GitHubCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubCredential")
            .field("token", &redact(&self.token))
            .finish()
    }
}

/// Username and password for a container registry
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ContainerCredential {
    pub username: String,
    pub password: String,
}

impl ContainerCredential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns true when every required field is filled in
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for ContainerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerCredential")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "<redacted>" }
}

/// One optional bundle per backend kind
///
/// A bundle may be stored partially filled (e.g. a username without a
/// password); consumers go through [`Credentials::usable_github`] and
/// [`Credentials::usable_container`], which only hand out complete bundles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub github: Option<GitHubCredential>,
    pub container: Option<ContainerCredential>,
}

impl Credentials {
    /// Reads every bundle through `lookup`
    ///
    /// A bundle is present as soon as one of its variables is set; missing
    /// fields are left empty.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let github = lookup(GITHUB_TOKEN_ENV).map(GitHubCredential::new);

        let username = lookup(REGISTRY_USERNAME_ENV);
        let password = lookup(REGISTRY_PASSWORD_ENV);
        let container = (username.is_some() || password.is_some()).then(|| {
            ContainerCredential::new(username.unwrap_or_default(), password.unwrap_or_default())
        });

        Self { github, container }
    }

    pub fn usable_github(&self) -> Option<&GitHubCredential> {
        self.github.as_ref().filter(|c| c.is_complete())
    }

    pub fn usable_container(&self) -> Option<&ContainerCredential> {
        self.container.as_ref().filter(|c| c.is_complete())
    }
}

/// Holder of the credential bundles shared by all release sources
///
/// Readers get a consistent snapshot per [`get`](Self::get) call. There is
/// no locking across a read followed by an update: concurrent updates are
/// last-writer-wins.
#[derive(Debug, Default)]
pub struct CredentialStore {
    credentials: RwLock<Option<Credentials>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the store from the process environment
    ///
    /// Every call re-reads the environment and replaces whatever was stored.
    pub fn bootstrap(&self) {
        self.bootstrap_with(|name| std::env::var(name).ok());
    }

    /// Populates the store through a custom variable lookup
    pub fn bootstrap_with<F>(&self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::from_lookup(lookup);
        info!(
            "Credentials bootstrapped (github: {}, container registry: {})",
            credentials.usable_github().is_some(),
            credentials.usable_container().is_some()
        );
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }

    /// Returns a snapshot of the stored bundles, or `None` before bootstrap
    pub fn get(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Overwrites the bundles present in `partial`, leaving the others untouched
    pub fn update(&self, partial: Credentials) -> Result<(), CredentialError> {
        let mut guard = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = guard.as_mut().ok_or(CredentialError::NotBootstrapped)?;

        if let Some(github) = partial.github {
            debug!("Updating github credentials");
            let target = stored.github.get_or_insert_with(GitHubCredential::default);
            target.token = github.token;
        }

        if let Some(container) = partial.container {
            debug!("Updating container registry credentials");
            let target = stored
                .container
                .get_or_insert_with(ContainerCredential::default);
            target.username = container.username;
            target.password = container.password;
        }

        Ok(())
    }

    /// Discards all stored bundles
    pub fn reset(&self) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
