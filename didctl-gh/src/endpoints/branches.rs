//! # Branch Endpoints
//!
//! Branch lifecycle. A branch is a tenant collection: it is created by
//! forking the empty base branch and deleted by removing its ref. `main` can
//! never be deleted.

use didctl_core::is_valid_ref_name;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::client::Transport;
use crate::consts::{MAIN_BRANCH, PAGE_SIZE};
use crate::db::GitHubDb;
use crate::error::{DbError, translate};
use crate::models::{Branch, GitRef};
use crate::pagination::collect_pages;

impl<T: Transport> GitHubDb<T> {
  /// List every branch of the repository
  #[instrument(skip(self), level = "debug")]
  pub async fn get_all_branches(&self) -> Result<Vec<Branch>, DbError> {
    collect_pages(|page| async move {
      let query = [("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())];
      let branches: Vec<Branch> = self.rest(Method::GET, "branches", &query, None).await?;
      Ok::<_, DbError>(branches)
    })
    .await
  }

  /// Get one branch
  #[instrument(skip(self), level = "debug")]
  pub async fn get_branch_info(&self, name: &str) -> Result<Branch, DbError> {
    self
      .rest(Method::GET, &format!("branches/{name}"), &[], None)
      .await
      .map_err(|failure| match translate(&failure) {
        DbError::GithubApi(_) if failure.is_not_found() => DbError::BranchNotExisted,
        other => other,
      })
  }

  /// SHA of the commit the branch currently points at
  #[instrument(skip(self), level = "debug")]
  pub async fn get_branch_last_commit_sha(&self, branch: &str) -> Result<String, DbError> {
    let git_ref: GitRef = self
      .rest(Method::GET, &format!("git/ref/heads/{branch}"), &[], None)
      .await
      .map_err(|failure| match translate(&failure) {
        DbError::GithubApi(_) if failure.is_not_found() => DbError::BranchNotExisted,
        other => other,
      })?;
    Ok(git_ref.object.sha)
  }

  /// Create `new_name` pointing at the current HEAD of `from_branch`
  #[instrument(skip(self), level = "debug")]
  pub async fn checkout_new_branch(&self, new_name: &str, from_branch: &str) -> Result<GitRef, DbError> {
    if !is_valid_ref_name(new_name) {
      return Err(DbError::InvalidRefName);
    }

    let sha = self.get_branch_last_commit_sha(from_branch).await?;
    let body = json!({ "ref": format!("refs/heads/{new_name}"), "sha": sha });
    let git_ref: GitRef = self
      .rest(Method::POST, "git/refs", &[], Some(body))
      .await
      .map_err(|failure| match translate(&failure) {
        DbError::RefExisted => DbError::BranchExisted,
        other => other,
      })?;

    info!("Created branch {new_name} from {from_branch} at {sha}");
    Ok(git_ref)
  }

  /// Get the branch, creating it from the empty base branch when missing.
  /// Safe to race: a caller that loses the creation race reads the winner's
  /// branch.
  #[instrument(skip(self), level = "debug")]
  pub async fn create_branch_if_not_exist(&self, name: &str) -> Result<Branch, DbError> {
    match self.get_branch_info(name).await {
      Err(DbError::BranchNotExisted) => {}
      found => return found,
    }

    match self.checkout_new_branch(name, &self.empty_branch).await {
      Ok(_) => {}
      Err(DbError::BranchExisted) => warn!("Branch {name} was created concurrently"),
      Err(error) => return Err(error),
    }
    self.get_branch_info(name).await
  }

  /// Delete a branch. Deleting `main` is refused before any request is made.
  #[instrument(skip(self), level = "debug")]
  pub async fn delete_branch(&self, name: &str) -> Result<(), DbError> {
    if name == MAIN_BRANCH {
      return Err(DbError::DeleteMainBranch);
    }

    self
      .rest_unit(Method::DELETE, &format!("git/refs/heads/{name}"), &[], None)
      .await
      .map_err(|failure| match translate(&failure) {
        DbError::RefNotExisted => DbError::BranchNotExisted,
        DbError::GithubApi(_) if failure.is_not_found() => DbError::BranchNotExisted,
        other => other,
      })?;

    info!("Deleted branch {name}");
    Ok(())
  }

  /// Delete a branch if present. Returns whether a branch was deleted.
  pub async fn delete_branch_if_exist(&self, name: &str) -> Result<bool, DbError> {
    match self.delete_branch(name).await {
      Ok(()) => Ok(true),
      Err(DbError::BranchNotExisted) => {
        debug!("Branch {name} already absent");
        Ok(false)
      }
      Err(error) => Err(error),
    }
  }
}
