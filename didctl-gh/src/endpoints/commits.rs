//! # Commit History
//!
//! Branch and file history over the GraphQL `history` connection. For a
//! file-scoped query an empty history is the only sign that the file does not
//! exist, so it surfaces as [`DbError::BlobNotExisted`].

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::client::Transport;
use crate::db::GitHubDb;
use crate::error::DbError;
use crate::models::{CommitHistory, CommitNode, PageInfo};
use crate::pagination::{CursorPage, collect_cursor};

pub(crate) const COMMIT_HISTORY_QUERY: &str = r#"
query CommitHistory($owner: String!, $name: String!, $qualifiedName: String!, $first: Int!, $after: String, $path: String) {
  repository(owner: $owner, name: $name) {
    ref(qualifiedName: $qualifiedName) {
      target {
        ... on Commit {
          history(first: $first, after: $after, path: $path) {
            totalCount
            pageInfo { hasNextPage endCursor }
            nodes { oid message committedDate }
          }
        }
      }
    }
  }
}
"#;

#[derive(Deserialize)]
struct HistoryData {
  repository: Option<HistoryRepository>,
}

#[derive(Deserialize)]
struct HistoryRepository {
  #[serde(rename = "ref")]
  reference: Option<HistoryRef>,
}

#[derive(Deserialize)]
struct HistoryRef {
  target: Option<HistoryTarget>,
}

#[derive(Deserialize)]
struct HistoryTarget {
  history: Option<HistoryConnection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryConnection {
  total_count: usize,
  #[serde(default)]
  page_info: PageInfo,
  #[serde(default)]
  nodes: Vec<CommitNode>,
}

impl<T: Transport> GitHubDb<T> {
  /// One page of history for `branch`, optionally restricted to `path`.
  /// `count` is capped at the upstream page size by the caller.
  #[instrument(skip(self), level = "debug")]
  pub async fn get_commit_history_page(
    &self,
    count: usize,
    branch: &str,
    path: Option<&str>,
    cursor: Option<&str>,
  ) -> Result<CursorPage<CommitNode>, DbError> {
    let variables = json!({
      "qualifiedName": format!("refs/heads/{branch}"),
      "first": count,
      "after": cursor,
      "path": path,
    });
    let data: HistoryData = self.graphql(COMMIT_HISTORY_QUERY, variables).await?;

    let connection = data
      .repository
      .and_then(|repository| repository.reference)
      .ok_or(DbError::BranchNotExisted)?
      .target
      .and_then(|target| target.history)
      .ok_or_else(|| DbError::GithubApi(format!("{branch} does not point at a commit")))?;

    if path.is_some() && connection.total_count == 0 {
      return Err(DbError::BlobNotExisted);
    }

    Ok(CursorPage {
      items: connection.nodes,
      total_count: connection.total_count,
      page_info: connection.page_info,
    })
  }

  /// Most recent first. `limit` of `None` walks the whole history.
  #[instrument(skip(self), level = "debug")]
  pub async fn get_commit_history(
    &self,
    limit: Option<usize>,
    branch: &str,
    path: Option<&str>,
  ) -> Result<CommitHistory, DbError> {
    let (history, total_count) = collect_cursor(limit, |first, after| async move {
      self.get_commit_history_page(first, branch, path, after.as_deref()).await
    })
    .await?;

    Ok(CommitHistory { history, total_count })
  }

  /// Last commit that touched `path` on `branch`
  pub async fn get_file_latest_commit(&self, branch: &str, path: &str) -> Result<CommitNode, DbError> {
    self
      .get_commit_history(Some(1), branch, Some(path))
      .await?
      .history
      .into_iter()
      .next()
      .ok_or(DbError::BlobNotExisted)
  }
}
