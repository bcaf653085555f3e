//! # Error Translation
//!
//! GitHub reuses 404, 409 and 422 for unrelated conditions, so the translator
//! looks at the status code and the upstream message together. Anything it
//! does not recognise becomes [`DbError::GithubApi`], which keeps the set of
//! errors callers can see closed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

// Upstream messages the translator keys on
pub const MSG_BAD_CREDENTIALS: &str = "Bad credentials";
pub const MSG_BRANCH_NOT_FOUND: &str = "Branch not found";
pub const MSG_NOT_FOUND: &str = "Not Found";
pub const MSG_REF_EXISTS: &str = "Reference already exists";
pub const MSG_REF_NOT_EXISTS: &str = "Reference does not exist";
pub const MSG_SHA_NOT_SUPPLIED: &str = "\"sha\" wasn't supplied";
pub const MSG_INVALID_REF: &str = "not a valid ref name";
pub const MSG_OBJECT_NOT_EXISTS: &str = "Object does not exist";
pub const MSG_BAD_SHA: &str = "must be exactly 40 characters";
pub const MSG_NOT_FAST_FORWARD: &str = "Update is not a fast forward";
pub const MSG_SHA_MISMATCH: &str = "does not match";

/// A raw failure as seen by the transport, before translation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFailure {
  #[error("HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("GraphQL errors: {}", join_messages(.0))]
  GraphQl(Vec<GraphQlError>),

  #[error("Request failed: {0}")]
  Network(String),

  #[error("Unexpected response: {0}")]
  Decode(String),
}

impl ApiFailure {
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiFailure::Http { status, .. } => Some(*status),
      _ => None,
    }
  }

  pub fn message(&self) -> Option<&str> {
    match self {
      ApiFailure::Http { message, .. } => Some(message),
      _ => None,
    }
  }

  /// Plain 404, the shape GitHub uses when a path or ref is missing
  pub fn is_not_found(&self) -> bool {
    self.status() == Some(404)
  }
}

/// One entry of a GraphQL `errors` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQlError {
  pub message: String,
  #[serde(rename = "type", default)]
  pub kind: Option<String>,
}

fn join_messages(errors: &[GraphQlError]) -> String {
  errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ")
}

/// Every error the storage layer reports. Compared structurally; callers are
/// expected to `match` on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
  #[error("GitHub API error: {0}")]
  GithubApi(String),

  #[error("Bad credentials for the GitHub API")]
  BadCredentials,

  #[error("The branch moved while pushing, re-read and try again")]
  ConflictPush,

  #[error("Blob already exists")]
  BlobExisted,

  #[error("Blob does not exist")]
  BlobNotExisted,

  #[error("Folder does not exist")]
  FolderNotExisted,

  #[error("Branch already exists")]
  BranchExisted,

  #[error("Branch does not exist")]
  BranchNotExisted,

  #[error("Reference already exists")]
  RefExisted,

  #[error("Reference does not exist")]
  RefNotExisted,

  #[error("Data has not changed")]
  DataNotChanged,

  #[error("The main branch cannot be deleted")]
  DeleteMainBranch,

  #[error("Invalid ref name")]
  InvalidRefName,

  #[error("Invalid git object id")]
  InvalidGitObjectId,

  #[error("Invalid wrapped document")]
  InvalidWrappedDocument,

  #[error("The record changed since it was read")]
  VersionMismatch,
}

/// Serialised error shape handed to HTTP callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
  pub code: u32,
  pub message: String,
}

impl DbError {
  /// Stable numeric code, independent of the message wording
  pub const fn code(&self) -> u32 {
    match self {
      DbError::GithubApi(_) => 1000,
      DbError::BadCredentials => 1001,
      DbError::ConflictPush => 1002,
      DbError::BlobExisted => 1003,
      DbError::BlobNotExisted => 1004,
      DbError::FolderNotExisted => 1005,
      DbError::BranchExisted => 1006,
      DbError::BranchNotExisted => 1007,
      DbError::RefExisted => 1008,
      DbError::RefNotExisted => 1009,
      DbError::DataNotChanged => 1010,
      DbError::DeleteMainBranch => 1011,
      DbError::InvalidRefName => 1012,
      DbError::InvalidGitObjectId => 1013,
      DbError::InvalidWrappedDocument => 1014,
      DbError::VersionMismatch => 1015,
    }
  }

  /// HTTP status the controllers answer with. Business errors always get a
  /// 4xx; upstream and configuration problems a 5xx.
  pub const fn http_status(&self) -> u16 {
    match self {
      DbError::GithubApi(_) => 502,
      DbError::BadCredentials => 500,
      DbError::ConflictPush | DbError::VersionMismatch => 409,
      DbError::BlobExisted | DbError::BranchExisted | DbError::RefExisted | DbError::DataNotChanged => 409,
      DbError::BlobNotExisted | DbError::FolderNotExisted | DbError::BranchNotExisted | DbError::RefNotExisted => 404,
      DbError::DeleteMainBranch => 403,
      DbError::InvalidRefName | DbError::InvalidGitObjectId | DbError::InvalidWrappedDocument => 400,
    }
  }

  pub fn body(&self) -> ErrorBody {
    ErrorBody {
      code: self.code(),
      message: self.to_string(),
    }
  }
}

/// Map a raw upstream failure onto the closed taxonomy. More specific message
/// checks come before the status-only fallbacks.
pub fn translate(failure: &ApiFailure) -> DbError {
  match failure {
    ApiFailure::Http { status, message } => translate_http(*status, message),
    ApiFailure::GraphQl(errors) => {
      warn!("GraphQL request failed: {}", join_messages(errors));
      DbError::GithubApi(join_messages(errors))
    }
    ApiFailure::Network(message) | ApiFailure::Decode(message) => DbError::GithubApi(message.clone()),
  }
}

fn translate_http(status: u16, message: &str) -> DbError {
  match status {
    401 => DbError::BadCredentials,
    404 if message == MSG_BRANCH_NOT_FOUND => DbError::BranchNotExisted,
    409 if message.contains(MSG_SHA_MISMATCH) => DbError::VersionMismatch,
    409 => DbError::ConflictPush,
    422 if message.contains(MSG_REF_EXISTS) => DbError::RefExisted,
    422 if message.contains(MSG_REF_NOT_EXISTS) => DbError::RefNotExisted,
    422 if message.contains(MSG_SHA_NOT_SUPPLIED) => DbError::BlobExisted,
    422 if message.contains(MSG_INVALID_REF) => DbError::InvalidRefName,
    422 if message.contains(MSG_OBJECT_NOT_EXISTS) || message.contains(MSG_BAD_SHA) => DbError::InvalidGitObjectId,
    422 if message.contains(MSG_NOT_FAST_FORWARD) => DbError::ConflictPush,
    _ => DbError::GithubApi(format!("HTTP {status}: {message}")),
  }
}

impl From<ApiFailure> for DbError {
  fn from(failure: ApiFailure) -> Self {
    translate(&failure)
  }
}
