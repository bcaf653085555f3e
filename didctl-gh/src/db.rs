//! # Object Store Facade
//!
//! [`GitHubDb`] is the entry point callers use. The operations themselves are
//! grouped by resource under [`crate::endpoints`]; this module holds the
//! struct and the typed request helpers they share.

use didctl_core::GitHubDbConfig;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::{GitHubClient, Transport};
use crate::error::ApiFailure;

/// A GitHub repository viewed as a database
pub struct GitHubDb<T: Transport = GitHubClient> {
  pub(crate) transport: T,
  pub(crate) owner: String,
  pub(crate) repo: String,
  pub(crate) empty_branch: String,
}

impl GitHubDb<GitHubClient> {
  /// Create a facade talking to GitHub over HTTP
  pub fn new(config: GitHubDbConfig) -> Self {
    Self::with_transport(GitHubClient::new(config.clone()), &config)
  }
}

impl<T: Transport> GitHubDb<T> {
  /// Create a facade over any transport (used by tests to plug an in-memory
  /// backend)
  pub fn with_transport(transport: T, config: &GitHubDbConfig) -> Self {
    Self {
      transport,
      owner: config.owner.clone(),
      repo: config.repo.clone(),
      empty_branch: config.empty_branch.clone(),
    }
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  pub fn owner(&self) -> &str {
    &self.owner
  }

  pub fn repo(&self) -> &str {
    &self.repo
  }

  /// Base branch new tenant branches are forked from
  pub fn empty_branch(&self) -> &str {
    &self.empty_branch
  }

  pub(crate) async fn rest<R: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<Value>,
  ) -> Result<R, ApiFailure> {
    let value = self.transport.rest(method, path, query, body).await?;
    serde_json::from_value(value).map_err(|e| ApiFailure::Decode(format!("{path}: {e}")))
  }

  /// REST call whose response body is irrelevant
  pub(crate) async fn rest_unit(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<Value>,
  ) -> Result<(), ApiFailure> {
    self.transport.rest(method, path, query, body).await.map(|_| ())
  }

  /// GraphQL call with `owner` and `name` variables bound to this repository
  pub(crate) async fn graphql<R: DeserializeOwned>(&self, query: &str, mut variables: Value) -> Result<R, ApiFailure> {
    if let Value::Object(map) = &mut variables {
      map.insert("owner".to_string(), Value::String(self.owner.clone()));
      map.insert("name".to_string(), Value::String(self.repo.clone()));
    }
    let data = self.transport.graphql(query, variables).await?;
    serde_json::from_value(data).map_err(|e| ApiFailure::Decode(format!("GraphQL: {e}")))
  }
}
