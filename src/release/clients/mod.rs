//! HTTP implementations of the backend capabilities

pub mod github;
pub mod registry;

pub use github::GitHubClient;
pub use registry::RegistryClient;
