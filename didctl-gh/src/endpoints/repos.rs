//! # Repository Endpoints
//!
//! Repository metadata, the default branch pointer and raw object access.

use reqwest::Method;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::client::Transport;
use crate::db::GitHubDb;
use crate::error::DbError;
use crate::models::{GitObjectType, RepoInfo};
use crate::utils::is_git_object_id;

impl<T: Transport> GitHubDb<T> {
  /// Fetch a raw git object by id
  #[instrument(skip(self), level = "debug")]
  pub async fn get(&self, id: &str, kind: GitObjectType) -> Result<Value, DbError> {
    if !is_git_object_id(id) {
      return Err(DbError::InvalidGitObjectId);
    }
    let path = format!("git/{}/{id}", kind.collection());
    Ok(self.rest(Method::GET, &path, &[], None).await?)
  }

  /// Fetch repository metadata
  #[instrument(skip(self), level = "debug")]
  pub async fn get_repo_info(&self) -> Result<RepoInfo, DbError> {
    Ok(self.rest(Method::GET, "", &[], None).await?)
  }

  /// Point the repository's default branch at `name`. Code search only
  /// indexes the default branch, and lags behind it.
  #[instrument(skip(self), level = "debug")]
  pub async fn set_default_branch(&self, name: &str) -> Result<RepoInfo, DbError> {
    let info: RepoInfo = self
      .rest(Method::PATCH, "", &[], Some(json!({ "default_branch": name })))
      .await?;
    info!("Default branch of {} set to {name}", info.full_name);
    Ok(info)
  }
}

#[cfg(test)]
mod tests {
  use wiremock::matchers::{body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::db::test_support::test_db;

  fn repo_json(default_branch: &str) -> Value {
    json!({
        "id": 1296269,
        "name": "repo",
        "full_name": "owner/repo",
        "default_branch": default_branch,
        "private": true
    })
  }

  #[tokio::test]
  async fn test_get_repo_info() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    Mock::given(method("GET"))
      .and(path("/repos/owner/repo"))
      .respond_with(ResponseTemplate::new(200).set_body_json(repo_json("main")))
      .mount(&mock_server)
      .await;

    let info = db.get_repo_info().await?;
    assert_eq!(info.full_name, "owner/repo");
    assert_eq!(info.default_branch, "main");
    assert!(info.private);

    Ok(())
  }

  #[tokio::test]
  async fn test_set_default_branch() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    Mock::given(method("PATCH"))
      .and(path("/repos/owner/repo"))
      .and(body_json(json!({"default_branch": "DID_acme"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(repo_json("DID_acme")))
      .expect(1)
      .mount(&mock_server)
      .await;

    let info = db.set_default_branch("DID_acme").await?;
    assert_eq!(info.default_branch, "DID_acme");

    Ok(())
  }

  #[tokio::test]
  async fn test_get_object() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);
    let sha = "3a0f86fb8db8eea7ccbb9a95f325ddbedfb25e15";

    Mock::given(method("GET"))
      .and(path(format!("/repos/owner/repo/git/blobs/{sha}")))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
          "content": "Q29udGVudCBvZiB0aGUgYmxvYg==",
          "encoding": "base64",
          "sha": sha,
          "size": 19
      })))
      .mount(&mock_server)
      .await;

    let object = db.get(sha, GitObjectType::Blob).await?;
    assert_eq!(object["size"], 19);

    Ok(())
  }

  #[tokio::test]
  async fn test_get_object_rejects_malformed_id_locally() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    let error = db.get("not-a-sha", GitObjectType::Commit).await.unwrap_err();
    assert_eq!(error, DbError::InvalidGitObjectId);
    assert!(mock_server.received_requests().await.unwrap_or_default().is_empty());

    Ok(())
  }

  #[tokio::test]
  async fn test_upstream_failure_is_translated() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    Mock::given(method("GET"))
      .and(path("/repos/owner/repo"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
      .mount(&mock_server)
      .await;

    assert_eq!(db.get_repo_info().await.unwrap_err(), DbError::BadCredentials);

    Ok(())
  }
}
