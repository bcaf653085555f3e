//! # Tags
//!
//! Lightweight tags as `refs/tags/*` refs. Listing goes through GraphQL so it
//! pages by cursor like commit history does.

use didctl_core::is_valid_ref_name;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::client::Transport;
use crate::db::GitHubDb;
use crate::error::{ApiFailure, DbError, translate};
use crate::models::{GitRef, PageInfo, Tag};
use crate::pagination::{CursorPage, collect_cursor};

pub(crate) const TAGS_QUERY: &str = r#"
query Tags($owner: String!, $name: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    refs(refPrefix: "refs/tags/", first: $first, after: $after, orderBy: {field: ALPHABETICAL, direction: DESC}) {
      totalCount
      pageInfo { hasNextPage endCursor }
      nodes { name target { oid } }
    }
  }
}
"#;

#[derive(Deserialize)]
struct TagsData {
  repository: Option<TagsRepository>,
}

#[derive(Deserialize)]
struct TagsRepository {
  refs: Option<TagConnection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagConnection {
  total_count: usize,
  #[serde(default)]
  page_info: PageInfo,
  #[serde(default)]
  nodes: Vec<TagNode>,
}

#[derive(Deserialize)]
struct TagNode {
  name: String,
  target: TagTarget,
}

#[derive(Deserialize)]
struct TagTarget {
  oid: String,
}

fn not_found_as_missing_ref(failure: ApiFailure) -> DbError {
  match translate(&failure) {
    DbError::GithubApi(_) if failure.is_not_found() => DbError::RefNotExisted,
    other => other,
  }
}

impl<T: Transport> GitHubDb<T> {
  /// One page of tags, reverse alphabetical
  #[instrument(skip(self), level = "debug")]
  pub async fn get_all_tags_page(&self, count: usize, cursor: Option<&str>) -> Result<CursorPage<Tag>, DbError> {
    let data: TagsData = self
      .graphql(TAGS_QUERY, json!({ "first": count, "after": cursor }))
      .await?;

    let connection = data
      .repository
      .and_then(|repository| repository.refs)
      .ok_or_else(|| DbError::GithubApi(format!("Repository {}/{} not found", self.owner, self.repo)))?;

    Ok(CursorPage {
      items: connection
        .nodes
        .into_iter()
        .map(|node| Tag {
          name: node.name,
          target_oid: node.target.oid,
        })
        .collect(),
      total_count: connection.total_count,
      page_info: connection.page_info,
    })
  }

  /// Every tag, reverse alphabetical
  pub async fn get_all_tags(&self) -> Result<Vec<Tag>, DbError> {
    let (tags, _) = collect_cursor(None, |first, after| async move {
      self.get_all_tags_page(first, after.as_deref()).await
    })
    .await?;
    Ok(tags)
  }

  #[instrument(skip(self), level = "debug")]
  pub async fn get_a_tag(&self, name: &str) -> Result<GitRef, DbError> {
    self
      .rest(Method::GET, &format!("git/ref/tags/{name}"), &[], None)
      .await
      .map_err(not_found_as_missing_ref)
  }

  /// Tag `sha` as `name`
  #[instrument(skip(self), level = "debug")]
  pub async fn tag(&self, name: &str, sha: &str) -> Result<GitRef, DbError> {
    if !is_valid_ref_name(name) {
      return Err(DbError::InvalidRefName);
    }

    let body = json!({ "ref": format!("refs/tags/{name}"), "sha": sha });
    let git_ref: GitRef = self.rest(Method::POST, "git/refs", &[], Some(body)).await?;
    info!("Tagged {sha} as {name}");
    Ok(git_ref)
  }

  #[instrument(skip(self), level = "debug")]
  pub async fn delete_a_tag(&self, name: &str) -> Result<(), DbError> {
    self
      .rest_unit(Method::DELETE, &format!("git/refs/tags/{name}"), &[], None)
      .await
      .map_err(not_found_as_missing_ref)?;
    info!("Deleted tag {name}");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::Value;
  use wiremock::matchers::{body_json, body_partial_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::db::test_support::test_db;

  const SHA: &str = "aa218f56b14c9653891f9e74264a383fa43fefbd";

  fn tags_response(total: usize, names: &[String], next: Option<&str>) -> Value {
    json!({
      "data": {"repository": {"refs": {
        "totalCount": total,
        "pageInfo": {"hasNextPage": next.is_some(), "endCursor": next},
        "nodes": names.iter().map(|name| json!({"name": name, "target": {"oid": SHA}})).collect::<Vec<_>>()
      }}}
    })
  }

  #[tokio::test]
  async fn test_get_all_tags_pages_without_duplicates() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    let names: Vec<String> = (0..130).rev().map(|i| format!("v{i:03}")).collect();

    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(body_partial_json(json!({"variables": {"first": 100, "after": null}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(tags_response(130, &names[..100], Some("c100"))))
      .expect(1)
      .mount(&mock_server)
      .await;

    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(body_partial_json(json!({"variables": {"after": "c100"}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(tags_response(130, &names[100..], None)))
      .expect(1)
      .mount(&mock_server)
      .await;

    let tags = db.get_all_tags().await?;
    let fetched: Vec<String> = tags.into_iter().map(|tag| tag.name).collect();
    assert_eq!(fetched, names);

    Ok(())
  }

  #[tokio::test]
  async fn test_tag_and_duplicate() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    Mock::given(method("POST"))
      .and(path("/repos/owner/repo/git/refs"))
      .and(body_json(json!({"ref": "refs/tags/v1", "sha": SHA})))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({
        "ref": "refs/tags/v1",
        "object": {"type": "commit", "sha": SHA}
      })))
      .up_to_n_times(1)
      .mount(&mock_server)
      .await;

    Mock::given(method("POST"))
      .and(path("/repos/owner/repo/git/refs"))
      .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "Reference already exists"})))
      .mount(&mock_server)
      .await;

    assert_eq!(db.tag("v1", SHA).await?.reference, "refs/tags/v1");
    assert_eq!(db.tag("v1", SHA).await.unwrap_err(), DbError::RefExisted);

    Ok(())
  }

  #[tokio::test]
  async fn test_invalid_tag_name_is_local() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    assert_eq!(db.tag("bad name", SHA).await.unwrap_err(), DbError::InvalidRefName);
    assert!(mock_server.received_requests().await.unwrap_or_default().is_empty());

    Ok(())
  }

  #[tokio::test]
  async fn test_missing_tag() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let db = test_db(&mock_server);

    Mock::given(method("GET"))
      .and(path("/repos/owner/repo/git/ref/tags/nope"))
      .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
      .mount(&mock_server)
      .await;

    Mock::given(method("DELETE"))
      .and(path("/repos/owner/repo/git/refs/tags/nope"))
      .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "Reference does not exist"})))
      .mount(&mock_server)
      .await;

    assert_eq!(db.get_a_tag("nope").await.unwrap_err(), DbError::RefNotExisted);
    assert_eq!(db.delete_a_tag("nope").await.unwrap_err(), DbError::RefNotExisted);

    Ok(())
  }
}
