//! # Directory Listing
//!
//! Tree listings through GraphQL `object(expression:)` and a recursive walk
//! built on top of them.

use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::contents::BlobFields;
use crate::client::Transport;
use crate::db::GitHubDb;
use crate::error::DbError;
use crate::models::{BlobFile, EntryKind, TreeEntry};
use crate::utils::{join_path, object_expression};

pub(crate) const TREE_AT_QUERY: &str = r#"
query TreeAt($owner: String!, $name: String!, $expression: String!, $withContent: Boolean!) {
  repository(owner: $owner, name: $name) {
    object(expression: $expression) {
      __typename
      ... on Tree {
        entries {
          name
          type
          mode
          object @include(if: $withContent) {
            ... on Blob { oid byteSize isBinary text }
          }
        }
      }
    }
  }
}
"#;

#[derive(Deserialize)]
struct TreeData {
  repository: Option<TreeRepository>,
}

#[derive(Deserialize)]
struct TreeRepository {
  object: Option<TreeObject>,
}

#[derive(Deserialize)]
struct TreeObject {
  #[serde(rename = "__typename")]
  typename: String,
  #[serde(default)]
  entries: Vec<RawEntry>,
}

#[derive(Deserialize)]
struct RawEntry {
  name: String,
  #[serde(rename = "type")]
  kind: EntryKind,
  mode: u32,
  #[serde(default)]
  object: Option<BlobFields>,
}

impl<T: Transport> GitHubDb<T> {
  /// List the directory at `path` (empty for the root) as of `commit`.
  /// With `allow_folder` unset only blob entries are returned; with
  /// `include_content` set blob entries carry their content.
  #[instrument(skip(self), level = "debug")]
  pub async fn get_files_of_tree(
    &self,
    path: &str,
    allow_folder: bool,
    commit: &str,
    include_content: bool,
  ) -> Result<Vec<TreeEntry>, DbError> {
    let variables = json!({
      "expression": object_expression(commit, path),
      "withContent": include_content,
    });
    let data: TreeData = self.graphql(TREE_AT_QUERY, variables).await?;

    let tree = data
      .repository
      .and_then(|repository| repository.object)
      .filter(|object| object.typename == "Tree")
      .ok_or(DbError::FolderNotExisted)?;

    let entries = tree
      .entries
      .into_iter()
      .filter(|entry| allow_folder || entry.kind == EntryKind::Blob);

    try_join_all(entries.map(|entry| async move {
      let entry_path = join_path(path, &entry.name);
      let object = match entry.object {
        Some(fields) if include_content && entry.kind == EntryKind::Blob => {
          Some(self.load_blob(&entry_path, fields).await?)
        }
        _ => None,
      };
      Ok::<_, DbError>(TreeEntry {
        name: entry.name,
        path: entry_path,
        kind: entry.kind,
        mode: entry.mode,
        object,
      })
    }))
    .await
  }

  /// Every blob on `branch` with its content, sorted by path. The walk is
  /// pinned to the branch HEAD at the time of the call.
  #[instrument(skip(self), level = "debug")]
  pub async fn get_all_files(&self, branch: &str) -> Result<Vec<BlobFile>, DbError> {
    let head = self.get_branch_last_commit_sha(branch).await?;
    let mut pending = vec![String::new()];
    let mut files = Vec::new();

    while let Some(dir) = pending.pop() {
      for entry in self.get_files_of_tree(&dir, true, &head, true).await? {
        match (entry.kind, entry.object) {
          (EntryKind::Tree, _) => pending.push(entry.path),
          (EntryKind::Blob, Some(file)) => files.push(file),
          (kind, _) => debug!("Skipping {} ({kind:?})", entry.path),
        }
      }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::{Value, json};
  use wiremock::matchers::{body_partial_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::codec::BlobContent;
  use crate::db::test_support::test_db;

  const HEAD_SHA: &str = "aa218f56b14c9653891f9e74264a383fa43fefbd";

  fn tree_response(entries: Value) -> Value {
    json!({"data": {"repository": {"object": {"__typename": "Tree", "entries": entries}}}})
  }

  fn blob_entry(name: &str, text: &str) -> Value {
    json!({
      "name": name,
      "type": "blob",
      "mode": 33188,
      "object": {"oid": format!("{:0>40}", name.len()), "byteSize": text.len(), "isBinary": false, "text": text}
    })
  }

  fn tree_entry(name: &str) -> Value {
    json!({"name": name, "type": "tree", "mode": 16384, "object": {}})
  }

  #[tokio::test]
  async fn test_list_root_without_content() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(body_partial_json(json!({"variables": {"expression": "HEAD:", "withContent": false}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(tree_response(json!([
        {"name": "0xabc.did", "type": "blob", "mode": 33188},
        {"name": "archive", "type": "tree", "mode": 16384}
      ]))))
      .mount(&mock_server)
      .await;

    let entries = db.get_files_of_tree("", true, "HEAD", false).await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].path, "0xabc.did");
    assert_eq!(entries[1].kind, EntryKind::Tree);
    assert!(entries.iter().all(|entry| entry.object.is_none()));

    let blobs = db.get_files_of_tree("", false, "HEAD", false).await?;
    assert_eq!(blobs.len(), 1);
    assert_eq!(blobs[0].kind, EntryKind::Blob);

    Ok(())
  }

  #[tokio::test]
  async fn test_list_with_content() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(body_partial_json(json!({"variables": {"expression": "HEAD:dir", "withContent": true}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(tree_response(json!([blob_entry("a.json", r#"{"a":1}"#)]))))
      .mount(&mock_server)
      .await;

    let entries = db.get_files_of_tree("dir", true, "HEAD", true).await?;
    assert_eq!(entries[0].path, "dir/a.json");
    let file = entries[0].object.as_ref().expect("content requested");
    assert_eq!(file.content, BlobContent::Json(json!({"a": 1})));

    Ok(())
  }

  #[tokio::test]
  async fn test_missing_folder() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(body_partial_json(json!({"variables": {"expression": "HEAD:nope"}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"repository": {"object": null}}})))
      .mount(&mock_server)
      .await;

    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(body_partial_json(json!({"variables": {"expression": "HEAD:a.json"}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": {"repository": {"object": {"__typename": "Blob"}}}
      })))
      .mount(&mock_server)
      .await;

    assert_eq!(
      db.get_files_of_tree("nope", true, "HEAD", false).await.unwrap_err(),
      DbError::FolderNotExisted
    );
    assert_eq!(
      db.get_files_of_tree("a.json", true, "HEAD", false).await.unwrap_err(),
      DbError::FolderNotExisted
    );

    Ok(())
  }

  #[tokio::test]
  async fn test_get_all_files_walks_subtrees() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    Mock::given(method("GET"))
      .and(path("/repos/owner/repo/git/ref/heads/main"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "ref": "refs/heads/main",
        "object": {"type": "commit", "sha": HEAD_SHA}
      })))
      .mount(&mock_server)
      .await;

    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(body_partial_json(json!({"variables": {"expression": format!("{HEAD_SHA}:")}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(tree_response(json!([
        blob_entry("z.txt", "last"),
        tree_entry("sub")
      ]))))
      .mount(&mock_server)
      .await;

    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(body_partial_json(json!({"variables": {"expression": format!("{HEAD_SHA}:sub")}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(tree_response(json!([blob_entry("a.json", "{}")]))))
      .mount(&mock_server)
      .await;

    let files = db.get_all_files("main").await?;
    let paths: Vec<&str> = files.iter().map(|file| file.path.as_str()).collect();
    assert_eq!(paths, vec!["sub/a.json", "z.txt"]);

    Ok(())
  }
}
