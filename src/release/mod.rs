//! Release tracking layer
//!
//! This module answers one question per tracked artifact: is there a release
//! newer than the one currently recorded?
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Credentials │────▶│   Source    │────▶│   Checker   │
//! │   (store)   │     │ (bootstrap) │     │  (compare)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │   Clients   │
//!                     │(github,oci) │
//!                     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`source`]: `ReleaseSource` trait every backend implements
//! - [`sources`]: GitHub and container registry sources plus the `Release` enum
//! - [`client`]: backend capability traits and the per-kind client registry
//! - [`clients`]: HTTP implementations of the backend capabilities
//! - [`checker`]: the shared new-version decision rule
//! - [`error`]: Error types for backend and source operations
//! - [`types`]: `Version`, `ReleaseKind` and result types

pub mod checker;
pub mod client;
pub mod clients;
pub mod error;
pub mod source;
pub mod sources;
pub mod types;
