use thiserror::Error;

use crate::release::types::ReleaseKind;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("Credentials for {0} are not set")]
    CredentialMissing(ReleaseKind),

    #[error("Release source {0} used before bootstrap")]
    NotBootstrapped(ReleaseKind),

    #[error("Upstream error: {0}")]
    Upstream(#[from] BackendError),

    #[error("Tag list is empty for {0}")]
    EmptyTagList(String),

    #[error("Unsupported release kind: {0}")]
    UnsupportedKind(ReleaseKind),
}
