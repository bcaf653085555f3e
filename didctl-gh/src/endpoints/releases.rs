//! # Releases
//!
//! A release is a tag with a description. Deleting one removes the release
//! object and its tag together.

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::client::Transport;
use crate::consts::{MAIN_BRANCH, PAGE_SIZE};
use crate::db::GitHubDb;
use crate::error::{DbError, translate};
use crate::models::Release;
use crate::pagination::collect_pages;

impl<T: Transport> GitHubDb<T> {
  /// Publish a release for `tag_name`. The tag is created at `commit`
  /// (default `main`) when it does not exist yet.
  #[instrument(skip(self), level = "debug")]
  pub async fn tag_commit_as_release(
    &self,
    tag_name: &str,
    message: Option<&str>,
    commit: Option<&str>,
  ) -> Result<Release, DbError> {
    let body = json!({
      "tag_name": tag_name,
      "name": tag_name,
      "body": message.unwrap_or_default(),
      "target_commitish": commit.unwrap_or(MAIN_BRANCH),
    });
    let release: Release = self.rest(Method::POST, "releases", &[], Some(body)).await?;
    info!("Published release {tag_name} at {}", release.target_commitish);
    Ok(release)
  }

  #[instrument(skip(self), level = "debug")]
  pub async fn get_a_release(&self, tag_name: &str) -> Result<Release, DbError> {
    self
      .rest(Method::GET, &format!("releases/tags/{tag_name}"), &[], None)
      .await
      .map_err(|failure| match translate(&failure) {
        DbError::GithubApi(_) if failure.is_not_found() => DbError::RefNotExisted,
        other => other,
      })
  }

  /// Every release, newest first as GitHub lists them
  #[instrument(skip(self), level = "debug")]
  pub async fn get_all_releases(&self) -> Result<Vec<Release>, DbError> {
    collect_pages(|page| async move {
      let query = [("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())];
      let releases: Vec<Release> = self.rest(Method::GET, "releases", &query, None).await?;
      Ok::<_, DbError>(releases)
    })
    .await
  }

  /// Delete the release for `tag_name` and its tag. Both deletes are always
  /// attempted, so a tag left behind by an earlier partial delete is still
  /// removed. The call only fails when both are missing or a delete fails
  /// for another reason.
  #[instrument(skip(self), level = "debug")]
  pub async fn delete_release(&self, tag_name: &str) -> Result<(), DbError> {
    let release_delete = async {
      let release = self.get_a_release(tag_name).await?;
      self
        .rest_unit(Method::DELETE, &format!("releases/{}", release.id), &[], None)
        .await
        .map_err(|failure| match translate(&failure) {
          DbError::GithubApi(_) if failure.is_not_found() => DbError::RefNotExisted,
          other => other,
        })
    };
    let (release_result, tag_result) = tokio::join!(release_delete, self.delete_a_tag(tag_name));

    match (release_result, tag_result) {
      (Err(DbError::RefNotExisted), Err(DbError::RefNotExisted)) => Err(DbError::RefNotExisted),
      (Err(error), _) if error != DbError::RefNotExisted => Err(error),
      (_, Err(error)) if error != DbError::RefNotExisted => Err(error),
      (release_result, tag_result) => {
        if release_result.is_err() {
          debug!("Release {tag_name} was already gone");
        }
        if tag_result.is_err() {
          debug!("Tag {tag_name} was already gone");
        }
        info!("Deleted release {tag_name}");
        Ok(())
      }
    }
  }
}
