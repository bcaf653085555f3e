//! Test utilities shared across the didctl workspace
//!
//! This crate provides common testing infrastructure including:
//! - An in-memory GitHub backend ([`FakeGitHub`])
//! - Wiremock fixtures for the GitHub REST and GraphQL endpoints
//!   ([`GitHubMock`])
//! - Temporary `config.toml` and `.netrc` files ([`ConfigFileGuard`],
//!   [`NetrcGuard`])
//!
//! The clippy dead_code lint is disabled for this crate because test utilities
//! may not be used by all tests, and the compiler cannot detect usage across
//! crate boundaries in development dependencies.

#![allow(dead_code)]

pub mod config;
pub mod fake;
pub mod mock;
pub mod netrc;

// Re-export commonly used items
pub use config::ConfigFileGuard;
pub use fake::FakeGitHub;
pub use mock::GitHubMock;
pub use netrc::NetrcGuard;
