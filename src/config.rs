use serde::Deserialize;
use std::path::PathBuf;

use crate::release::types::{ReleaseKind, Version};

// =============================================================================
// Environment
// =============================================================================

/// Environment variable holding the GitHub API token
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_APP_TOKEN";

/// Environment variable holding the container registry username
pub const REGISTRY_USERNAME_ENV: &str = "DOCKER_USERNAME";

/// Environment variable holding the container registry password
pub const REGISTRY_PASSWORD_ENV: &str = "DOCKER_PASSWORD";

// =============================================================================
// Endpoints
// =============================================================================

/// Default base URL for the GitHub REST API
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default container registry (Docker Hub)
pub const DEFAULT_REGISTRY_URL: &str = "https://registry-1.docker.io";

/// User agent sent with every backend request
pub const USER_AGENT: &str = concat!("version-checker/", env!("CARGO_PKG_VERSION"));

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckerConfig {
    pub endpoints: EndpointsConfig,
}

/// Backend endpoints used when building clients
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EndpointsConfig {
    pub github_api_url: String,
    pub registry_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}

/// One tracked release
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReleaseConfig {
    pub name: String,
    pub kind: ReleaseKind,
    pub version: String,
    pub spec: ReleaseSpec,
}

impl ReleaseConfig {
    pub fn current_version(&self) -> Version {
        Version::new(self.version.as_str())
    }
}

/// Where a release lives: `org/repo` on GitHub, `org/name` in a registry
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReleaseSpec {
    pub org: String,
    #[serde(alias = "name")]
    pub repo: String,
}

/// Returns the path to the data directory for version-checker.
/// Uses $XDG_DATA_HOME/version-checker if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/version-checker,
/// or ./version-checker if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("version-checker.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("version-checker")
}
