//! # GitHub HTTP Client
//!
//! Authenticated REST and GraphQL calls against one repository. The client
//! shapes requests and reports failures as raw [`ApiFailure`] values; turning
//! those into domain errors happens one layer up, in the facade.

use std::future::Future;

use didctl_core::GitHubDbConfig;
use reqwest::header::{ACCEPT as ACCEPT_HEADER, AUTHORIZATION, USER_AGENT as USER_AGENT_HEADER};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::consts::{ACCEPT, ACCEPT_RAW, USER_AGENT};
use crate::error::{ApiFailure, GraphQlError};

/// The calls the storage facade needs from GitHub. Paths are relative to
/// `repos/<owner>/<repo>/`; an empty path addresses the repository itself.
pub trait Transport: Send + Sync {
  /// JSON REST call. Empty (204) responses come back as `Value::Null`.
  fn rest(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<Value>,
  ) -> impl Future<Output = Result<Value, ApiFailure>> + Send;

  /// GET with the raw media type, returning the undecoded body
  fn rest_raw(&self, path: &str, query: &[(&str, String)]) -> impl Future<Output = Result<Vec<u8>, ApiFailure>> + Send;

  /// GraphQL query returning the `data` member. A 200 response carrying an
  /// `errors` array is a failure.
  fn graphql(&self, query: &str, variables: Value) -> impl Future<Output = Result<Value, ApiFailure>> + Send;
}

/// Represents a GitHub API client bound to one repository
pub struct GitHubClient {
  pub(crate) client: Client,
  pub(crate) config: GitHubDbConfig,
}

#[derive(Deserialize)]
struct GraphQlResponse {
  #[serde(default)]
  data: Option<Value>,
  #[serde(default)]
  errors: Option<Vec<GraphQlError>>,
}

impl GitHubClient {
  /// Create a new GitHub client
  pub fn new(config: GitHubDbConfig) -> Self {
    let client = Client::new();
    Self { client, config }
  }

  pub fn config(&self) -> &GitHubDbConfig {
    &self.config
  }

  /// Resolve a repository-relative path, encoding each segment
  fn repo_url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiFailure> {
    let mut url = Url::parse(&self.config.repo_url()).map_err(|e| ApiFailure::Network(e.to_string()))?;
    {
      let mut segments = url
        .path_segments_mut()
        .map_err(|()| ApiFailure::Network(format!("Cannot use {} as a base URL", self.config.api_base_url)))?;
      segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
    }
    if !query.is_empty() {
      url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(url)
  }

  fn authorized(&self, builder: RequestBuilder, accept: &str) -> RequestBuilder {
    builder
      .header(ACCEPT_HEADER, accept)
      .header(USER_AGENT_HEADER, USER_AGENT)
      .header(AUTHORIZATION, format!("token {}", self.config.token))
  }

  async fn send(builder: RequestBuilder) -> Result<Response, ApiFailure> {
    let response = builder.send().await.map_err(|e| ApiFailure::Network(e.to_string()))?;
    if response.status().is_success() {
      return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    // Try to extract the error message from the response
    let message = serde_json::from_str::<Value>(&body)
      .ok()
      .and_then(|json| json.get("message").and_then(Value::as_str).map(str::to_string))
      .unwrap_or(body);

    debug!(status, %message, "GitHub request failed");
    Err(ApiFailure::Http { status, message })
  }
}

impl Transport for GitHubClient {
  #[instrument(skip(self, body), level = "debug")]
  async fn rest(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<Value>,
  ) -> Result<Value, ApiFailure> {
    let url = self.repo_url(path, query)?;
    let mut builder = self.authorized(self.client.request(method, url), ACCEPT);
    if let Some(body) = body {
      builder = builder.json(&body);
    }

    let response = Self::send(builder).await?;
    let text = response.text().await.map_err(|e| ApiFailure::Network(e.to_string()))?;
    if text.trim().is_empty() {
      return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| ApiFailure::Decode(e.to_string()))
  }

  #[instrument(skip(self), level = "debug")]
  async fn rest_raw(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>, ApiFailure> {
    let url = self.repo_url(path, query)?;
    let builder = self.authorized(self.client.get(url), ACCEPT_RAW);

    let response = Self::send(builder).await?;
    let bytes = response.bytes().await.map_err(|e| ApiFailure::Network(e.to_string()))?;
    Ok(bytes.to_vec())
  }

  #[instrument(skip(self, query), level = "debug")]
  async fn graphql(&self, query: &str, variables: Value) -> Result<Value, ApiFailure> {
    let builder = self.authorized(self.client.post(&self.config.graphql_url), ACCEPT).json(&json!({
      "query": query,
      "variables": variables,
    }));

    let response = Self::send(builder).await?;
    let parsed: GraphQlResponse = response.json().await.map_err(|e| ApiFailure::Decode(e.to_string()))?;

    if let Some(errors) = parsed.errors.filter(|errors| !errors.is_empty()) {
      return Err(ApiFailure::GraphQl(errors));
    }
    parsed
      .data
      .ok_or_else(|| ApiFailure::Decode("GraphQL response has no data".to_string()))
  }
}

#[cfg(test)]
mod tests {
  use wiremock::matchers::{body_partial_json, header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;

  async fn client_for(server: &MockServer) -> GitHubClient {
    GitHubClient::new(GitHubDbConfig::new("owner", "repo", "test_token").with_base_url(&server.uri()))
  }

  #[tokio::test]
  async fn test_rest_sends_auth_and_accept_headers() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server).await;

    Mock::given(method("GET"))
      .and(path("/repos/owner/repo/branches"))
      .and(query_param("per_page", "100"))
      .and(header("Authorization", "token test_token"))
      .and(header("Accept", "application/vnd.github.v3+json"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
      .mount(&mock_server)
      .await;

    let value = client
      .rest(Method::GET, "branches", &[("per_page", "100".to_string())], None)
      .await?;
    assert_eq!(value, serde_json::json!([]));

    Ok(())
  }

  #[tokio::test]
  async fn test_rest_empty_path_is_repo_root() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server).await;

    Mock::given(method("GET"))
      .and(path("/repos/owner/repo"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "repo"})))
      .mount(&mock_server)
      .await;

    let value = client.rest(Method::GET, "", &[], None).await?;
    assert_eq!(value["name"], "repo");

    Ok(())
  }

  #[tokio::test]
  async fn test_rest_error_keeps_status_and_message() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server).await;

    Mock::given(method("GET"))
      .and(path("/repos/owner/repo/branches/nope"))
      .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
          "message": "Branch not found",
          "documentation_url": "https://docs.github.com/rest"
      })))
      .mount(&mock_server)
      .await;

    let failure = client.rest(Method::GET, "branches/nope", &[], None).await.unwrap_err();
    assert_eq!(
      failure,
      ApiFailure::Http {
        status: 404,
        message: "Branch not found".to_string()
      }
    );

    Ok(())
  }

  #[tokio::test]
  async fn test_rest_no_content_is_null() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server).await;

    Mock::given(method("DELETE"))
      .and(path("/repos/owner/repo/git/refs/heads/feature"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&mock_server)
      .await;

    let value = client
      .rest(Method::DELETE, "git/refs/heads/feature", &[], None)
      .await?;
    assert_eq!(value, Value::Null);

    Ok(())
  }

  #[tokio::test]
  async fn test_rest_raw_uses_raw_media_type() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server).await;

    Mock::given(method("GET"))
      .and(path("/repos/owner/repo/contents/logo.png"))
      .and(header("Accept", "application/vnd.github.v3.raw"))
      .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]))
      .mount(&mock_server)
      .await;

    let bytes = client.rest_raw("contents/logo.png", &[]).await?;
    assert_eq!(bytes, vec![0x89, 0x50, 0x4e, 0x47]);

    Ok(())
  }

  #[tokio::test]
  async fn test_graphql_errors_with_200_are_failures() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server).await;

    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(body_partial_json(serde_json::json!({"variables": {"owner": "owner"}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
          "data": null,
          "errors": [{"type": "NOT_FOUND", "message": "Could not resolve to a Repository"}]
      })))
      .mount(&mock_server)
      .await;

    let failure = client
      .graphql("query Q { viewer { login } }", serde_json::json!({"owner": "owner"}))
      .await
      .unwrap_err();

    match failure {
      ApiFailure::GraphQl(errors) => {
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind.as_deref(), Some("NOT_FOUND"));
      }
      other => panic!("unexpected failure: {other:?}"),
    }

    Ok(())
  }

  #[tokio::test]
  async fn test_graphql_returns_data() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server).await;

    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(header("Authorization", "token test_token"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
          "data": {"repository": {"name": "repo"}}
      })))
      .mount(&mock_server)
      .await;

    let data = client.graphql("query Q { x }", serde_json::json!({})).await?;
    assert_eq!(data["repository"]["name"], "repo");

    Ok(())
  }

  #[test]
  fn test_repo_url_encodes_segments() {
    let client = GitHubClient::new(GitHubDbConfig::new("owner", "repo", "t"));
    let url = client
      .repo_url("contents/dir/my file.json", &[("ref", "DID_acme".to_string())])
      .unwrap();
    assert_eq!(
      url.as_str(),
      "https://api.github.com/repos/owner/repo/contents/dir/my%20file.json?ref=DID_acme"
    );
  }
}
