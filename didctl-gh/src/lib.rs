//! # GitHub Repository Database
//!
//! Uses a GitHub repository as a versioned document store: branches are
//! collections, blobs are records and every write is a commit. Calls go
//! through GitHub's REST and GraphQL APIs, and every upstream failure is
//! translated into the closed [`DbError`] taxonomy before it leaves the crate.

pub mod client;
pub mod codec;
pub mod consts;
pub mod db;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod pagination;
pub mod utils;

// Re-export the client and facade
pub use client::{GitHubClient, Transport};
pub use codec::{BlobContent, try_parse_json};
pub use db::GitHubDb;
pub use error::{ApiFailure, DbError, ErrorBody, GraphQlError, translate};
// Re-export models
pub use models::{
  BlobFile, Branch, CommitHistory, CommitNode, EntryKind, FileRevision, GitObjectType, GitRef, PageInfo, Release,
  RepoInfo, Tag, TreeEntry, WriteResult,
};
