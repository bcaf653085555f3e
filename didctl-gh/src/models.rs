use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::BlobContent;

/// Repository metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoInfo {
  pub id: u64,
  pub name: String,
  pub full_name: String,
  pub default_branch: String,
  #[serde(default)]
  pub private: bool,
  #[serde(default)]
  pub description: Option<String>,
}

/// A branch, i.e. one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
  pub name: String,
  pub commit: CommitPointer,
  #[serde(default)]
  pub protected: bool,
}

/// Commit a branch or ref points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPointer {
  pub sha: String,
}

/// A git reference (`refs/heads/*` or `refs/tags/*`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
  #[serde(rename = "ref")]
  pub reference: String,
  pub object: RefObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefObject {
  pub sha: String,
  #[serde(rename = "type")]
  pub kind: String,
}

/// Raw git object kinds addressable by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitObjectType {
  Blob,
  Tree,
  Commit,
  Tag,
}

impl GitObjectType {
  /// Collection segment under `git/`
  pub const fn collection(self) -> &'static str {
    match self {
      GitObjectType::Blob => "blobs",
      GitObjectType::Tree => "trees",
      GitObjectType::Commit => "commits",
      GitObjectType::Tag => "tags",
    }
  }
}

/// One commit of a branch or file history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNode {
  pub oid: String,
  pub message: String,
  pub committed_date: DateTime<Utc>,
}

/// Relay-style connection cursor state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
  pub has_next_page: bool,
  pub end_cursor: Option<String>,
}

/// Commits of a branch (or of one file), most recent first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHistory {
  pub history: Vec<CommitNode>,
  pub total_count: usize,
}

/// A blob read at a given commit
#[derive(Debug, Clone, PartialEq)]
pub struct BlobFile {
  pub path: String,
  pub oid: String,
  pub byte_size: u64,
  pub is_binary: bool,
  pub content: BlobContent,
  /// Blob text exactly as stored; `None` for binary blobs
  pub text: Option<String>,
}

impl BlobFile {
  /// The stored bytes, without re-serialising JSON content
  pub fn raw_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
    match &self.text {
      Some(text) => Ok(text.clone().into_bytes()),
      None => self.content.to_bytes(),
    }
  }
}

/// A file's content at one commit of its history
#[derive(Debug, Clone, PartialEq)]
pub struct FileRevision {
  pub commit: CommitNode,
  pub file: BlobFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
  Blob,
  Tree,
  /// Submodule pointer
  Commit,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
  pub name: String,
  pub path: String,
  pub kind: EntryKind,
  pub mode: u32,
  /// Only set when content was requested and the entry is a blob
  pub object: Option<BlobFile>,
}

/// Result of a create or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
  pub path: String,
  pub sha: String,
  pub size: u64,
  pub commit_sha: String,
}

/// A tag and the object it points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub name: String,
  pub target_oid: String,
}

/// A GitHub release: a tag with a description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
  pub id: u64,
  pub tag_name: String,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub body: Option<String>,
  pub target_commitish: String,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_branch_deserialization() {
    let json = json!({
        "name": "DID_acme",
        "commit": {
            "sha": "c5b97d5ae6c19d5c5df71a34c7fbeeda2479ccbc",
            "url": "https://api.github.com/repos/octocat/Hello-World/commits/c5b97d5"
        },
        "protected": false
    });

    let branch: Branch = serde_json::from_value(json).unwrap();

    assert_eq!(branch.name, "DID_acme");
    assert_eq!(branch.commit.sha, "c5b97d5ae6c19d5c5df71a34c7fbeeda2479ccbc");
    assert!(!branch.protected);
  }

  #[test]
  fn test_git_ref_deserialization() {
    let json = json!({
        "ref": "refs/tags/v1",
        "node_id": "MDM6UmVmcmVmcy9oZWFkcy9mZWF0dXJlQQ==",
        "object": {
            "type": "commit",
            "sha": "aa218f56b14c9653891f9e74264a383fa43fefbd"
        }
    });

    let git_ref: GitRef = serde_json::from_value(json).unwrap();

    assert_eq!(git_ref.reference, "refs/tags/v1");
    assert_eq!(git_ref.object.kind, "commit");
  }

  #[test]
  fn test_commit_node_deserialization() {
    let json = json!({
        "oid": "aa218f56b14c9653891f9e74264a383fa43fefbd",
        "message": "Add credential",
        "committedDate": "2023-03-01T10:00:00Z"
    });

    let node: CommitNode = serde_json::from_value(json).unwrap();

    assert_eq!(node.message, "Add credential");
    assert_eq!(node.committed_date.to_rfc3339(), "2023-03-01T10:00:00+00:00");
  }

  #[test]
  fn test_release_deserialization() {
    let json = json!({
        "id": 1,
        "tag_name": "v1.0.0",
        "target_commitish": "main",
        "name": "v1.0.0",
        "body": "Description of the release",
        "draft": false,
        "created_at": "2013-02-27T19:35:32Z"
    });

    let release: Release = serde_json::from_value(json).unwrap();

    assert_eq!(release.id, 1);
    assert_eq!(release.body.as_deref(), Some("Description of the release"));
  }

  #[test]
  fn test_object_type_collections() {
    assert_eq!(GitObjectType::Blob.collection(), "blobs");
    assert_eq!(GitObjectType::Commit.collection(), "commits");
  }
}
