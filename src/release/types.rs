//! Common types for release sources

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of release source
///
/// Open set of names: the well-known kinds are exposed as constants, but any
/// string is a valid kind so that unknown entries can still be reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseKind(Cow<'static, str>);

impl ReleaseKind {
    /// GitHub repository releases
    pub const GITHUB: ReleaseKind = ReleaseKind(Cow::Borrowed("github"));
    /// Tags of an image repository in a container registry
    pub const CONTAINER_REGISTRY: ReleaseKind = ReleaseKind(Cow::Borrowed("container-registry"));

    pub fn new(kind: impl Into<String>) -> Self {
        Self(Cow::Owned(kind.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ReleaseKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

/// A version as reported by a release source
///
/// Two versions are equal when their values are equal; the observation time
/// never takes part in the comparison and no semantic parsing is applied
/// (`v1.2.0` and `1.2.0` are different versions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    observed_at: Option<DateTime<Utc>>,
}

impl Version {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            observed_at: None,
        }
    }

    /// Creates a version carrying the time the backend published it
    pub fn observed(value: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            observed_at: Some(observed_at),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.observed_at
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Result of checking a source for a new version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCheck {
    /// Latest version reported by the backend, returned even when not newer
    pub latest: Version,
    /// Whether `latest` differs from the recorded current version
    pub is_newer: bool,
}

/// Outcome of comparing the manifests behind two tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagComparison {
    /// Both tags point at the same image content
    Equal,
    /// The tags point at different image content
    Different,
}
