//! # Record Contents
//!
//! Reading and writing blobs. Every write goes through [`GitHubDb::mutate`],
//! the optimistic-concurrency primitive: with no expected version it creates,
//! with one it replaces exactly that version and fails otherwise.

use futures::future::try_join_all;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::client::Transport;
use crate::codec::{BlobContent, normalize_base64, resolve_is_binary};
use crate::db::GitHubDb;
use crate::error::{DbError, MSG_NOT_FOUND, translate};
use crate::models::{BlobFile, FileRevision, WriteResult};
use crate::utils::object_expression;

pub(crate) const BLOB_AT_QUERY: &str = r#"
query BlobAt($owner: String!, $name: String!, $expression: String!) {
  repository(owner: $owner, name: $name) {
    object(expression: $expression) {
      __typename
      ... on Blob { oid byteSize isBinary text }
    }
  }
}
"#;

#[derive(Deserialize)]
struct BlobData {
  repository: Option<BlobRepository>,
}

#[derive(Deserialize)]
struct BlobRepository {
  object: Option<BlobFields>,
}

/// Blob fields as selected by `... on Blob { oid byteSize isBinary text }`.
/// All empty when the object is not a blob.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BlobFields {
  #[serde(rename = "__typename", default)]
  pub(crate) typename: Option<String>,
  pub(crate) oid: Option<String>,
  pub(crate) byte_size: Option<u64>,
  pub(crate) is_binary: Option<bool>,
  pub(crate) text: Option<String>,
}

#[derive(Deserialize)]
struct RawBlob {
  content: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
  content: Option<ContentMeta>,
  commit: CommitMeta,
}

#[derive(Deserialize)]
struct ContentMeta {
  path: String,
  sha: String,
  #[serde(default)]
  size: u64,
}

#[derive(Deserialize)]
struct CommitMeta {
  sha: String,
}

impl<T: Transport> GitHubDb<T> {
  /// Whether `path` exists on `branch`. A plain not-found answers `false`;
  /// every other failure is still an error.
  #[instrument(skip(self), level = "debug")]
  pub async fn is_existed_file(&self, path: &str, branch: &str) -> Result<bool, DbError> {
    let query = [("ref", branch.to_string())];
    match self.transport.rest(Method::GET, &format!("contents/{path}"), &query, None).await {
      Ok(_) => Ok(true),
      Err(failure) if failure.is_not_found() && failure.message() == Some(MSG_NOT_FOUND) => Ok(false),
      Err(failure) => Err(translate(&failure)),
    }
  }

  /// Base64 content of a blob by id
  #[instrument(skip(self), level = "debug")]
  pub async fn get_file_as_binary(&self, sha: &str) -> Result<String, DbError> {
    let blob: RawBlob = self.rest(Method::GET, &format!("git/blobs/{sha}"), &[], None).await?;
    Ok(normalize_base64(&blob.content))
  }

  /// Read `path` at `commit` (a sha, a branch name or `HEAD`)
  #[instrument(skip(self), level = "debug")]
  pub async fn get_file(&self, path: &str, commit: &str) -> Result<BlobFile, DbError> {
    let variables = json!({ "expression": object_expression(commit, path) });
    let data: BlobData = self.graphql(BLOB_AT_QUERY, variables).await?;

    let object = data
      .repository
      .and_then(|repository| repository.object)
      .filter(|object| object.typename.as_deref() == Some("Blob"))
      .ok_or(DbError::BlobNotExisted)?;
    self.load_blob(path, object).await
  }

  /// Turn selected blob fields into a [`BlobFile`], fetching the raw content
  /// when the blob is binary
  pub(crate) async fn load_blob(&self, path: &str, fields: BlobFields) -> Result<BlobFile, DbError> {
    let oid = fields.oid.ok_or(DbError::BlobNotExisted)?;

    let is_binary = resolve_is_binary(fields.is_binary, path);
    let (content, text) = if is_binary {
      (BlobContent::Binary(self.get_file_as_binary(&oid).await?), None)
    } else {
      let text = fields.text.unwrap_or_default();
      (BlobContent::from_text(&text), Some(text))
    };

    Ok(BlobFile {
      path: path.to_string(),
      oid,
      byte_size: fields.byte_size.unwrap_or_default(),
      is_binary,
      content,
      text,
    })
  }

  /// Undecoded bytes of `path` on `branch`
  #[instrument(skip(self), level = "debug")]
  pub async fn get_file_raw(&self, path: &str, branch: &str) -> Result<Vec<u8>, DbError> {
    let query = [("ref", branch.to_string())];
    self
      .transport
      .rest_raw(&format!("contents/{path}"), &query)
      .await
      .map_err(|failure| match translate(&failure) {
        DbError::GithubApi(_) if failure.is_not_found() => DbError::BlobNotExisted,
        other => other,
      })
  }

  /// Every version of `path` on `branch`, newest first. Commits that removed
  /// the file have no content and are left out.
  #[instrument(skip(self), level = "debug")]
  pub async fn get_file_history(&self, path: &str, branch: &str) -> Result<Vec<FileRevision>, DbError> {
    let history = self.get_commit_history(None, branch, Some(path)).await?;
    debug!("Fetching {} revisions of {path}", history.history.len());

    let revisions = try_join_all(history.history.into_iter().map(|commit| async move {
      match self.get_file(path, &commit.oid).await {
        Ok(file) => Ok(Some(FileRevision { commit, file })),
        Err(DbError::BlobNotExisted) => Ok(None),
        Err(error) => Err(error),
      }
    }))
    .await?;

    Ok(revisions.into_iter().flatten().collect())
  }

  /// Write `content` to `path` on `branch` as one commit. `expected_version`
  /// is the blob sha the write replaces; `None` means the path must be new.
  #[instrument(skip(self, content), level = "debug")]
  pub async fn mutate(
    &self,
    path: &str,
    expected_version: Option<&str>,
    content: &BlobContent,
    branch: &str,
    message: &str,
  ) -> Result<WriteResult, DbError> {
    let mut body = json!({
      "message": message,
      "content": content.to_base64(),
      "branch": branch,
    });
    if let (Some(sha), Value::Object(map)) = (expected_version, &mut body) {
      map.insert("sha".to_string(), Value::String(sha.to_string()));
    }

    let response: ContentsResponse = self
      .rest(Method::PUT, &format!("contents/{path}"), &[], Some(body))
      .await?;
    let meta = response
      .content
      .ok_or_else(|| DbError::GithubApi(format!("No content in write response for {path}")))?;

    info!("Wrote {} on {branch} in commit {}", meta.path, response.commit.sha);
    Ok(WriteResult {
      path: meta.path,
      sha: meta.sha,
      size: meta.size,
      commit_sha: response.commit.sha,
    })
  }

  /// Create `path`; fails with [`DbError::BlobExisted`] if it already exists
  pub async fn create_new_file(
    &self,
    path: &str,
    content: &BlobContent,
    branch: &str,
    message: &str,
  ) -> Result<WriteResult, DbError> {
    self.mutate(path, None, content, branch, message).await
  }

  /// Replace `path` on `branch`. Identical content is refused with
  /// [`DbError::DataNotChanged`] and nothing is written.
  #[instrument(skip(self, content), level = "debug")]
  pub async fn update_file(
    &self,
    path: &str,
    content: &BlobContent,
    branch: &str,
    message: &str,
  ) -> Result<WriteResult, DbError> {
    let head = self.get_branch_last_commit_sha(branch).await?;
    let current = self.get_file(path, &head).await?;
    if current.content.same_as(content) {
      return Err(DbError::DataNotChanged);
    }
    self.mutate(path, Some(&current.oid), content, branch, message).await
  }

  /// Remove `path` from `branch`. Returns the sha of the deleting commit.
  #[instrument(skip(self), level = "debug")]
  pub async fn delete_file(&self, path: &str, branch: &str, message: Option<&str>) -> Result<String, DbError> {
    let head = self.get_branch_last_commit_sha(branch).await?;
    let current = self.get_file(path, &head).await?;

    let message = message.map_or_else(|| format!("Delete {path}"), str::to_string);
    let body = json!({ "message": message, "sha": current.oid, "branch": branch });
    let response: ContentsResponse = self
      .rest(Method::DELETE, &format!("contents/{path}"), &[], Some(body))
      .await?;

    info!("Deleted {path} from {branch} in commit {}", response.commit.sha);
    Ok(response.commit.sha)
  }
}
