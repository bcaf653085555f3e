//! Wiremock fixtures for GitHub
//!
//! [`GitHubMock`] wraps a [`MockServer`] and mounts the responses GitHub gives
//! for `owner/repo`, so tests only spell out what they care about.

use didctl_core::GitHubDbConfig;
use didctl_gh::GitHubDb;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Repository every fixture answers for
pub const MOCK_OWNER: &str = "owner";
pub const MOCK_REPO: &str = "repo";
pub const MOCK_TOKEN: &str = "test_token";

/// A wiremock server impersonating the REST and GraphQL APIs
pub struct GitHubMock {
  pub server: MockServer,
}

impl GitHubMock {
  pub async fn start() -> Self {
    Self {
      server: MockServer::start().await,
    }
  }

  /// Base URL to use as the API URL (GraphQL lives at `<uri>/graphql`)
  pub fn uri(&self) -> String {
    self.server.uri()
  }

  pub fn config(&self) -> GitHubDbConfig {
    GitHubDbConfig::new(MOCK_OWNER, MOCK_REPO, MOCK_TOKEN).with_base_url(&self.uri())
  }

  /// Facade talking to this server
  pub fn db(&self) -> GitHubDb {
    GitHubDb::new(self.config())
  }

  fn repo_path(suffix: &str) -> String {
    if suffix.is_empty() {
      format!("/repos/{MOCK_OWNER}/{MOCK_REPO}")
    } else {
      format!("/repos/{MOCK_OWNER}/{MOCK_REPO}/{suffix}")
    }
  }

  /// Number of requests the server has seen
  pub async fn request_count(&self) -> usize {
    self.server.received_requests().await.map_or(0, |requests| requests.len())
  }

  pub async fn mount_repo_info(&self, default_branch: &str) {
    Mock::given(method("GET"))
      .and(path(Self::repo_path("")))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "id": 1,
        "name": MOCK_REPO,
        "full_name": format!("{MOCK_OWNER}/{MOCK_REPO}"),
        "default_branch": default_branch,
        "private": true
      })))
      .mount(&self.server)
      .await;
  }

  /// Serve `names` through the paginated branch listing, 100 per page
  pub async fn mount_branches(&self, names: &[String]) {
    let pages: Vec<&[String]> = names.chunks(100).collect();
    let page_count = pages.len();
    for (index, page) in pages.into_iter().enumerate() {
      let branches: Vec<Value> = page
        .iter()
        .map(|name| json!({"name": name, "commit": {"sha": fake_sha(name)}, "protected": false}))
        .collect();
      Mock::given(method("GET"))
        .and(path(Self::repo_path("branches")))
        .and(query_param("page", (index + 1).to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(branches))
        .mount(&self.server)
        .await;
    }
    // The page after the last full one comes back empty
    Mock::given(method("GET"))
      .and(path(Self::repo_path("branches")))
      .and(query_param("page", (page_count + 1).to_string()))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .mount(&self.server)
      .await;
  }

  /// Answer `git/ref/heads/<branch>` with `sha`
  pub async fn mount_branch_head(&self, branch: &str, sha: &str) {
    Mock::given(method("GET"))
      .and(path(Self::repo_path(&format!("git/ref/heads/{branch}"))))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "ref": format!("refs/heads/{branch}"),
        "object": {"type": "commit", "sha": sha}
      })))
      .mount(&self.server)
      .await;
  }

  /// Answer a branch history query with one commit made at `committed_date`
  pub async fn mount_head_commit(&self, branch: &str, committed_date: &str) {
    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(body_string_contains("query CommitHistory"))
      .and(body_partial_json(json!({"variables": {"qualifiedName": format!("refs/heads/{branch}")}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": {"repository": {"ref": {"target": {"history": {
          "totalCount": 1,
          "pageInfo": {"hasNextPage": false, "endCursor": "1"},
          "nodes": [{"oid": fake_sha(branch), "message": "update", "committedDate": committed_date}]
        }}}}}
      })))
      .mount(&self.server)
      .await;
  }

  /// Answer a directory listing of `expression` (`<commit>:<dir>`) with
  /// `entries`, each `{name, type, mode, object}` as GitHub returns them
  pub async fn mount_tree(&self, expression: &str, entries: Value) {
    Mock::given(method("POST"))
      .and(path("/graphql"))
      .and(body_string_contains("query TreeAt"))
      .and(body_partial_json(json!({"variables": {"expression": expression}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": {"repository": {"object": {"__typename": "Tree", "entries": entries}}}
      })))
      .mount(&self.server)
      .await;
  }

  /// Accept the deletion of `refs/heads/<branch>`, expecting it `times` times
  pub async fn expect_branch_delete(&self, branch: &str, times: u64) {
    Mock::given(method("DELETE"))
      .and(path(Self::repo_path(&format!("git/refs/heads/{branch}"))))
      .respond_with(ResponseTemplate::new(204))
      .expect(times)
      .mount(&self.server)
      .await;
  }

  /// Answer every request on `suffix` with `status` and a GitHub error body
  pub async fn mount_error(&self, http_method: &str, suffix: &str, status: u16, message: &str) {
    Mock::given(method(http_method))
      .and(path(Self::repo_path(suffix)))
      .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "message": message })))
      .mount(&self.server)
      .await;
  }
}

/// A text blob entry for [`GitHubMock::mount_tree`]
pub fn text_entry(name: &str, text: &str) -> Value {
  json!({
    "name": name,
    "type": "blob",
    "mode": 33188,
    "object": {"oid": fake_sha(name), "byteSize": text.len(), "isBinary": false, "text": text}
  })
}

/// A sub-directory entry for [`GitHubMock::mount_tree`]
pub fn dir_entry(name: &str) -> Value {
  json!({"name": name, "type": "tree", "mode": 16384, "object": {}})
}

/// Deterministic 40-character id derived from a name
pub fn fake_sha(name: &str) -> String {
  let sum = name.bytes().fold(0u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(u64::from(byte)));
  format!("{sum:040x}")
}
