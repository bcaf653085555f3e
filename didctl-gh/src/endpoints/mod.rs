//! # Facade Operations
//!
//! Operations of [`crate::GitHubDb`] grouped by the git resource they work
//! on: repository metadata, branches, commit history, file contents, trees,
//! tags and releases.

pub mod branches;
pub mod commits;
pub mod contents;
pub mod releases;
pub mod repos;
pub mod tags;
pub mod trees;
