//! # didctl Core Library
//!
//! Shared building blocks for the didctl workspace: the explicit configuration
//! injected into storage facades, GitHub token discovery, and the naming rules
//! that map tenants and document kinds onto branches and record paths.

pub mod config;
pub mod credentials;
pub mod namespace;

// Re-export main types for the storage and CLI crates
pub use config::{ConfigDirs, DidctlConfig, GitHubDbConfig, RepoNames};
pub use namespace::{DocumentKind, Namespace, is_valid_ref_name};
