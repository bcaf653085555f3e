//! In-memory GitHub
//!
//! [`FakeGitHub`] implements [`Transport`] over an in-memory commit graph, so
//! facade behaviour that depends on state (idempotence, history length,
//! races) can be tested without a network. It answers the REST paths and the
//! named GraphQL operations the facade sends, with GitHub's status codes and
//! messages.
//!
//! Every call yields to the scheduler first, so futures combined with
//! `tokio::join!` interleave. A write gate makes concurrent content writes
//! read the same branch HEAD before either commits.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex as StdMutex};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, TimeDelta, Utc};
use didctl_core::config::DEFAULT_EMPTY_BRANCH;
use didctl_core::{GitHubDbConfig, is_valid_ref_name};
use didctl_gh::{ApiFailure, GitHubDb, Transport};
use reqwest::Method;
use serde_json::{Value, json};
use tokio::sync::{Barrier, Mutex};

pub const FAKE_OWNER: &str = "owner";
pub const FAKE_REPO: &str = "repo";

const BLOB_MODE: u32 = 0o100644;
const TREE_MODE: u32 = 0o040000;
const FIRST_COMMIT_TIMESTAMP: i64 = 1_704_067_200;

fn failure(status: u16, message: impl Into<String>) -> ApiFailure {
  ApiFailure::Http {
    status,
    message: message.into(),
  }
}

fn not_found() -> ApiFailure {
  failure(404, "Not Found")
}

fn str_field<'a>(body: &'a Value, field: &str) -> Result<&'a str, ApiFailure> {
  body
    .get(field)
    .and_then(Value::as_str)
    .ok_or_else(|| failure(422, format!("Invalid request.\n\n\"{field}\" wasn't supplied.")))
}

fn query_value<'a>(query: &'a [(&str, String)], key: &str) -> Option<&'a str> {
  query.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
}

#[derive(Clone)]
struct FakeCommit {
  parent: Option<String>,
  message: String,
  date: DateTime<Utc>,
  /// path -> blob sha
  files: BTreeMap<String, String>,
}

struct FakeRelease {
  id: u64,
  tag_name: String,
  body: String,
  target_commitish: String,
  created_at: DateTime<Utc>,
}

impl FakeRelease {
  fn to_json(&self) -> Value {
    json!({
      "id": self.id,
      "tag_name": self.tag_name,
      "name": self.tag_name,
      "body": self.body,
      "target_commitish": self.target_commitish,
      "created_at": self.created_at,
    })
  }
}

/// What lives at a path of a commit
enum PathObject<'a> {
  Blob(&'a str),
  Tree,
}

struct RepoState {
  blobs: HashMap<String, Vec<u8>>,
  commits: HashMap<String, FakeCommit>,
  branches: BTreeMap<String, String>,
  tags: BTreeMap<String, String>,
  releases: Vec<FakeRelease>,
  default_branch: String,
  counter: u64,
  clock: DateTime<Utc>,
}

impl RepoState {
  fn new() -> Self {
    let mut state = Self {
      blobs: HashMap::new(),
      commits: HashMap::new(),
      branches: BTreeMap::new(),
      tags: BTreeMap::new(),
      releases: Vec::new(),
      default_branch: "main".to_string(),
      counter: 0,
      clock: DateTime::from_timestamp(FIRST_COMMIT_TIMESTAMP, 0).unwrap_or_default(),
    };
    let root = state.new_commit(None, "Initial commit", BTreeMap::new());
    state.branches.insert("main".to_string(), root.clone());
    state.branches.insert(DEFAULT_EMPTY_BRANCH.to_string(), root);
    state
  }

  fn next_sha(&mut self) -> String {
    self.counter += 1;
    format!("{:040x}", self.counter)
  }

  fn new_commit(&mut self, parent: Option<String>, message: &str, files: BTreeMap<String, String>) -> String {
    let sha = self.next_sha();
    self.clock += TimeDelta::minutes(1);
    let commit = FakeCommit {
      parent,
      message: message.to_string(),
      date: self.clock,
      files,
    };
    self.commits.insert(sha.clone(), commit);
    sha
  }

  fn add_blob(&mut self, bytes: Vec<u8>) -> String {
    let sha = self.next_sha();
    self.blobs.insert(sha.clone(), bytes);
    sha
  }

  /// Advance `branch` with a commit whose tree is `files`
  fn commit_on(&mut self, branch: &str, message: &str, files: BTreeMap<String, String>) -> String {
    let parent = self.branches.get(branch).cloned();
    let sha = self.new_commit(parent, message, files);
    self.branches.insert(branch.to_string(), sha.clone());
    sha
  }

  /// `HEAD`, a branch, a tag or a commit sha
  fn resolve(&self, rev: &str) -> Option<String> {
    if rev == "HEAD" {
      return self.branches.get(&self.default_branch).cloned();
    }
    self
      .branches
      .get(rev)
      .or_else(|| self.tags.get(rev))
      .cloned()
      .or_else(|| self.commits.contains_key(rev).then(|| rev.to_string()))
  }

  fn files_at(&self, commit: &str) -> Option<&BTreeMap<String, String>> {
    self.commits.get(commit).map(|commit| &commit.files)
  }

  fn head_files(&self, branch: &str) -> Result<(String, BTreeMap<String, String>), ApiFailure> {
    let head = self
      .branches
      .get(branch)
      .ok_or_else(|| failure(404, "Branch not found"))?;
    let files = self.files_at(head).cloned().unwrap_or_default();
    Ok((head.clone(), files))
  }

  fn object_at<'a>(files: &'a BTreeMap<String, String>, path: &str) -> Option<PathObject<'a>> {
    let path = path.trim_matches('/');
    if path.is_empty() {
      return Some(PathObject::Tree);
    }
    if let Some(sha) = files.get(path) {
      return Some(PathObject::Blob(sha));
    }
    let prefix = format!("{path}/");
    files.keys().any(|key| key.starts_with(&prefix)).then_some(PathObject::Tree)
  }

  fn blob_fields(&self, sha: &str) -> Value {
    let bytes = self.blobs.get(sha).map(Vec::as_slice).unwrap_or_default();
    match std::str::from_utf8(bytes) {
      Ok(text) => json!({"oid": sha, "byteSize": bytes.len(), "isBinary": false, "text": text}),
      // GitHub cannot always classify content; report it as unknown
      Err(_) => json!({"oid": sha, "byteSize": bytes.len(), "isBinary": null, "text": null}),
    }
  }

  fn blob_json(&self, sha: &str) -> Result<Value, ApiFailure> {
    let bytes = self.blobs.get(sha).ok_or_else(not_found)?;
    let encoded = STANDARD.encode(bytes);
    // GitHub wraps base64 payloads at 60 columns
    let wrapped = encoded
      .as_bytes()
      .chunks(60)
      .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
      .collect::<Vec<_>>()
      .join("\n");
    Ok(json!({"sha": sha, "size": bytes.len(), "encoding": "base64", "content": wrapped}))
  }

  fn branch_json(&self, name: &str, sha: &str) -> Value {
    json!({"name": name, "commit": {"sha": sha}, "protected": name == self.default_branch})
  }

  fn ref_json(reference: &str, sha: &str) -> Value {
    json!({"ref": reference, "object": {"type": "commit", "sha": sha}})
  }

  fn route(
    &mut self,
    method: &str,
    segments: &[&str],
    query: &[(&str, String)],
    body: Option<Value>,
  ) -> Result<Value, ApiFailure> {
    let body = body.unwrap_or(Value::Null);
    match (method, segments) {
      ("GET", []) => Ok(self.repo_json()),
      ("PATCH", []) => {
        let name = str_field(&body, "default_branch")?;
        if !self.branches.contains_key(name) {
          return Err(failure(422, "Validation Failed"));
        }
        self.default_branch = name.to_string();
        Ok(self.repo_json())
      }
      ("GET", ["branches"]) => {
        let per_page: usize = query_value(query, "per_page").and_then(|v| v.parse().ok()).unwrap_or(30);
        let page: usize = query_value(query, "page").and_then(|v| v.parse().ok()).unwrap_or(1);
        let listed: Vec<Value> = self
          .branches
          .iter()
          .skip(page.saturating_sub(1) * per_page)
          .take(per_page)
          .map(|(name, sha)| self.branch_json(name, sha))
          .collect();
        Ok(Value::Array(listed))
      }
      ("GET", ["branches", name @ ..]) => {
        let name = name.join("/");
        let sha = self
          .branches
          .get(&name)
          .ok_or_else(|| failure(404, "Branch not found"))?;
        Ok(self.branch_json(&name, sha))
      }
      ("GET", ["git", "ref", "heads", name @ ..]) => {
        let name = name.join("/");
        let sha = self.branches.get(&name).ok_or_else(not_found)?;
        Ok(Self::ref_json(&format!("refs/heads/{name}"), sha))
      }
      ("GET", ["git", "ref", "tags", name @ ..]) => {
        let name = name.join("/");
        let sha = self.tags.get(&name).ok_or_else(not_found)?;
        Ok(Self::ref_json(&format!("refs/tags/{name}"), sha))
      }
      ("POST", ["git", "refs"]) => self.create_ref(&body),
      ("DELETE", ["git", "refs", "heads", name @ ..]) => {
        let name = name.join("/");
        self
          .branches
          .remove(&name)
          .map(|_| Value::Null)
          .ok_or_else(|| failure(422, "Reference does not exist"))
      }
      ("DELETE", ["git", "refs", "tags", name @ ..]) => {
        let name = name.join("/");
        self
          .tags
          .remove(&name)
          .map(|_| Value::Null)
          .ok_or_else(|| failure(422, "Reference does not exist"))
      }
      ("GET", ["git", "blobs", sha]) => self.blob_json(sha),
      ("GET", ["git", "commits", sha]) => {
        let commit = self.commits.get(*sha).ok_or_else(not_found)?;
        Ok(json!({"sha": sha, "message": commit.message, "parents": commit.parent.iter().map(|p| json!({"sha": p})).collect::<Vec<_>>()}))
      }
      ("GET", ["contents", path @ ..]) => self.get_contents(&path.join("/"), query),
      ("DELETE", ["contents", path @ ..]) => self.delete_contents(&path.join("/"), &body),
      ("GET", ["releases"]) => {
        let per_page: usize = query_value(query, "per_page").and_then(|v| v.parse().ok()).unwrap_or(30);
        let page: usize = query_value(query, "page").and_then(|v| v.parse().ok()).unwrap_or(1);
        Ok(Value::Array(
          self
            .releases
            .iter()
            .rev()
            .skip(page.saturating_sub(1) * per_page)
            .take(per_page)
            .map(FakeRelease::to_json)
            .collect(),
        ))
      }
      ("POST", ["releases"]) => self.create_release(&body),
      ("GET", ["releases", "tags", tag @ ..]) => {
        let tag = tag.join("/");
        self
          .releases
          .iter()
          .find(|release| release.tag_name == tag)
          .map(FakeRelease::to_json)
          .ok_or_else(not_found)
      }
      ("DELETE", ["releases", id]) => {
        let id: u64 = id.parse().map_err(|_| not_found())?;
        let index = self
          .releases
          .iter()
          .position(|release| release.id == id)
          .ok_or_else(not_found)?;
        self.releases.remove(index);
        Ok(Value::Null)
      }
      _ => Err(not_found()),
    }
  }

  fn repo_json(&self) -> Value {
    json!({
      "id": 1,
      "name": FAKE_REPO,
      "full_name": format!("{FAKE_OWNER}/{FAKE_REPO}"),
      "default_branch": self.default_branch,
      "private": true,
      "description": null,
    })
  }

  fn create_ref(&mut self, body: &Value) -> Result<Value, ApiFailure> {
    let reference = str_field(body, "ref")?.to_string();
    let sha = str_field(body, "sha")?.to_string();

    let (refs, name) = if let Some(name) = reference.strip_prefix("refs/heads/") {
      (&mut self.branches, name)
    } else if let Some(name) = reference.strip_prefix("refs/tags/") {
      (&mut self.tags, name)
    } else {
      return Err(failure(422, format!("{reference} is not a valid ref name.")));
    };

    if !is_valid_ref_name(name) {
      return Err(failure(422, format!("{reference} is not a valid ref name.")));
    }
    if !self.commits.contains_key(&sha) {
      return Err(failure(422, "Object does not exist"));
    }
    if refs.contains_key(name) {
      return Err(failure(422, "Reference already exists"));
    }
    refs.insert(name.to_string(), sha.clone());
    Ok(Self::ref_json(&reference, &sha))
  }

  fn get_contents(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiFailure> {
    let rev = query_value(query, "ref").unwrap_or(&self.default_branch);
    let commit = self
      .resolve(rev)
      .ok_or_else(|| failure(404, format!("No commit found for the ref {rev}")))?;
    let files = self.files_at(&commit).ok_or_else(not_found)?;

    match Self::object_at(files, path).ok_or_else(not_found)? {
      PathObject::Blob(sha) => {
        let mut blob = self.blob_json(sha)?;
        if let Value::Object(map) = &mut blob {
          map.insert("type".to_string(), json!("file"));
          map.insert("path".to_string(), json!(path));
        }
        Ok(blob)
      }
      PathObject::Tree => Ok(Value::Array(
        Self::children(files, path)
          .into_iter()
          .map(|(name, is_tree)| json!({"name": name, "type": if is_tree { "dir" } else { "file" }}))
          .collect(),
      )),
    }
  }

  fn raw_contents(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>, ApiFailure> {
    let rev = query_value(query, "ref").unwrap_or(&self.default_branch);
    let commit = self
      .resolve(rev)
      .ok_or_else(|| failure(404, format!("No commit found for the ref {rev}")))?;
    let sha = self
      .files_at(&commit)
      .and_then(|files| files.get(path))
      .ok_or_else(not_found)?;
    self.blobs.get(sha).cloned().ok_or_else(not_found)
  }

  /// Apply a contents write computed against `expected_head`
  fn write_file(&mut self, path: &str, expected_head: &str, body: &Value) -> Result<Value, ApiFailure> {
    let branch = str_field(body, "branch")?.to_string();
    let message = str_field(body, "message")?.to_string();
    let encoded = str_field(body, "content")?;
    let bytes = STANDARD
      .decode(encoded)
      .map_err(|_| failure(422, "content is not valid Base64"))?;

    let (head, mut files) = self.head_files(&branch)?;
    if head != expected_head {
      return Err(failure(409, format!("is at {head} but expected {expected_head}")));
    }
    match (files.get(path), body.get("sha").and_then(Value::as_str)) {
      (Some(_), None) => return Err(failure(422, "Invalid request.\n\n\"sha\" wasn't supplied.")),
      (current, Some(sha)) if current.map(String::as_str) != Some(sha) => {
        return Err(failure(409, format!("{path} does not match {sha}")));
      }
      _ => {}
    }

    let size = bytes.len();
    let blob = self.add_blob(bytes);
    files.insert(path.to_string(), blob.clone());
    let commit = self.commit_on(&branch, &message, files);
    Ok(json!({
      "content": {"path": path, "sha": blob, "size": size},
      "commit": {"sha": commit, "message": message},
    }))
  }

  fn delete_contents(&mut self, path: &str, body: &Value) -> Result<Value, ApiFailure> {
    let branch = str_field(body, "branch")?.to_string();
    let message = str_field(body, "message")?.to_string();
    let sha = str_field(body, "sha")?;

    let (_, mut files) = self.head_files(&branch)?;
    match files.get(path) {
      None => return Err(not_found()),
      Some(current) if current != sha => return Err(failure(409, format!("{path} does not match {sha}"))),
      Some(_) => {}
    }

    files.remove(path);
    let commit = self.commit_on(&branch, &message, files);
    Ok(json!({"content": null, "commit": {"sha": commit, "message": message}}))
  }

  fn create_release(&mut self, body: &Value) -> Result<Value, ApiFailure> {
    let tag_name = str_field(body, "tag_name")?.to_string();
    let target = body
      .get("target_commitish")
      .and_then(Value::as_str)
      .unwrap_or(&self.default_branch)
      .to_string();

    if self.releases.iter().any(|release| release.tag_name == tag_name) {
      return Err(failure(422, "Validation Failed: already_exists"));
    }
    if !self.tags.contains_key(&tag_name) {
      let commit = self.resolve(&target).ok_or_else(|| failure(422, "Validation Failed"))?;
      self.tags.insert(tag_name.clone(), commit);
    }

    self.counter += 1;
    self.clock += TimeDelta::minutes(1);
    let release = FakeRelease {
      id: self.counter,
      tag_name,
      body: body.get("body").and_then(Value::as_str).unwrap_or_default().to_string(),
      target_commitish: target,
      created_at: self.clock,
    };
    let json = release.to_json();
    self.releases.push(release);
    Ok(json)
  }

  /// Immediate children of `dir`: name -> is_tree
  fn children(files: &BTreeMap<String, String>, dir: &str) -> BTreeMap<String, bool> {
    let dir = dir.trim_matches('/');
    let prefix = if dir.is_empty() { String::new() } else { format!("{dir}/") };
    let mut children = BTreeMap::new();
    for key in files.keys() {
      if let Some(rest) = key.strip_prefix(&prefix) {
        match rest.split_once('/') {
          Some((name, _)) => children.insert(name.to_string(), true),
          None => children.insert(rest.to_string(), false),
        };
      }
    }
    children
  }

  fn graphql(&self, query: &str, variables: &Value) -> Result<Value, ApiFailure> {
    let var = |name: &str| variables.get(name).and_then(Value::as_str);
    let operation = operation_name(query).unwrap_or_default();

    match operation {
      "BlobAt" | "TreeAt" => {
        let expression = var("expression").unwrap_or_default();
        let (rev, path) = expression.split_once(':').unwrap_or((expression, ""));
        let with_content = variables.get("withContent").and_then(Value::as_bool).unwrap_or(false);

        let object = self
          .resolve(rev)
          .and_then(|commit| self.files_at(&commit))
          .and_then(|files| Some((files, Self::object_at(files, path)?)))
          .map(|(files, object)| match object {
            PathObject::Blob(sha) => {
              let mut fields = self.blob_fields(sha);
              if let Value::Object(map) = &mut fields {
                map.insert("__typename".to_string(), json!("Blob"));
              }
              fields
            }
            PathObject::Tree => {
              let prefix = path.trim_matches('/');
              let entries: Vec<Value> = Self::children(files, prefix)
                .into_iter()
                .map(|(name, is_tree)| {
                  let full = if prefix.is_empty() { name.clone() } else { format!("{prefix}/{name}") };
                  let mut entry = json!({
                    "name": name,
                    "type": if is_tree { "tree" } else { "blob" },
                    "mode": if is_tree { TREE_MODE } else { BLOB_MODE },
                  });
                  if with_content && let Value::Object(map) = &mut entry {
                    let object = match files.get(&full) {
                      Some(sha) if !is_tree => self.blob_fields(sha),
                      _ => json!({}),
                    };
                    map.insert("object".to_string(), object);
                  }
                  entry
                })
                .collect();
              json!({"__typename": "Tree", "entries": entries})
            }
          });
        Ok(json!({"repository": {"object": object}}))
      }
      "CommitHistory" => {
        let branch = var("qualifiedName")
          .and_then(|name| name.strip_prefix("refs/heads/"))
          .unwrap_or_default();
        let Some(head) = self.branches.get(branch) else {
          return Ok(json!({"repository": {"ref": null}}));
        };
        let history = self.history(head, var("path"));
        let (nodes, page_info) = page(&history, variables);
        let nodes: Vec<Value> = nodes
          .iter()
          .map(|sha| {
            let commit = &self.commits[sha.as_str()];
            json!({"oid": sha, "message": commit.message, "committedDate": commit.date})
          })
          .collect();
        Ok(json!({"repository": {"ref": {"target": {"history": {
          "totalCount": history.len(),
          "pageInfo": page_info,
          "nodes": nodes,
        }}}}}))
      }
      "Tags" => {
        let names: Vec<String> = self.tags.keys().rev().cloned().collect();
        let (nodes, page_info) = page(&names, variables);
        let nodes: Vec<Value> = nodes
          .iter()
          .map(|name| json!({"name": name, "target": {"oid": self.tags[name.as_str()]}}))
          .collect();
        Ok(json!({"repository": {"refs": {
          "totalCount": names.len(),
          "pageInfo": page_info,
          "nodes": nodes,
        }}}))
      }
      other => Err(ApiFailure::GraphQl(vec![didctl_gh::GraphQlError {
        message: format!("Unknown operation {other}"),
        kind: None,
      }])),
    }
  }

  /// Commits reachable from `head`, newest first. With a path, only commits
  /// that changed the blob at that path.
  fn history(&self, head: &str, path: Option<&str>) -> Vec<String> {
    let mut shas = Vec::new();
    let mut cursor = Some(head.to_string());
    while let Some(sha) = cursor {
      let Some(commit) = self.commits.get(&sha) else { break };
      let parent_files = commit.parent.as_deref().and_then(|parent| self.files_at(parent));
      let touched = path.is_none_or(|path| {
        commit.files.get(path) != parent_files.and_then(|files| files.get(path))
      });
      if touched {
        shas.push(sha.clone());
      }
      cursor = commit.parent.clone();
    }
    shas
  }
}

fn operation_name(query: &str) -> Option<&str> {
  let rest = query.trim_start().strip_prefix("query")?.trim_start();
  rest
    .split(|c: char| c == '(' || c == '{' || c.is_whitespace())
    .next()
}

/// Slice one cursor page out of `items`. Cursors are end offsets.
fn page<'a, I>(items: &'a [I], variables: &Value) -> (&'a [I], Value) {
  let first = variables.get("first").and_then(Value::as_u64).unwrap_or(100) as usize;
  let start = variables
    .get("after")
    .and_then(Value::as_str)
    .and_then(|cursor| cursor.parse::<usize>().ok())
    .unwrap_or(0)
    .min(items.len());
  let end = (start + first).min(items.len());
  let end_cursor = (end > start).then(|| end.to_string());
  (
    &items[start..end],
    json!({"hasNextPage": end < items.len(), "endCursor": end_cursor}),
  )
}

/// In-memory GitHub repository implementing [`Transport`]
pub struct FakeGitHub {
  state: Mutex<RepoState>,
  write_gate: Option<Arc<Barrier>>,
  requests: StdMutex<Vec<String>>,
}

impl Default for FakeGitHub {
  fn default() -> Self {
    Self::new()
  }
}

impl FakeGitHub {
  /// A repository with `main` and the empty base branch on one empty commit
  pub fn new() -> Self {
    Self {
      state: Mutex::new(RepoState::new()),
      write_gate: None,
      requests: StdMutex::new(Vec::new()),
    }
  }

  /// Hold every contents write after it has read the branch HEAD until
  /// `parties` writes are waiting
  pub fn with_write_gate(mut self, parties: usize) -> Self {
    self.write_gate = Some(Arc::new(Barrier::new(parties)));
    self
  }

  /// Wrap in a facade for `owner/repo`
  pub fn into_db(self) -> GitHubDb<FakeGitHub> {
    GitHubDb::with_transport(self, &GitHubDbConfig::new(FAKE_OWNER, FAKE_REPO, "fake_token"))
  }

  /// Create `name` from the empty base branch
  pub async fn create_branch(&self, name: &str) {
    let mut state = self.state.lock().await;
    let base = state.branches[DEFAULT_EMPTY_BRANCH].clone();
    state.branches.insert(name.to_string(), base);
  }

  /// Commit `bytes` at `path` on an existing branch. Returns the commit sha.
  pub async fn commit_file(&self, branch: &str, path: &str, bytes: &[u8], message: &str) -> String {
    let mut state = self.state.lock().await;
    let (_, mut files) = state.head_files(branch).expect("branch exists");
    let blob = state.add_blob(bytes.to_vec());
    files.insert(path.to_string(), blob);
    state.commit_on(branch, message, files)
  }

  pub async fn branch_head(&self, name: &str) -> Option<String> {
    self.state.lock().await.branches.get(name).cloned()
  }

  pub async fn branch_names(&self) -> Vec<String> {
    self.state.lock().await.branches.keys().cloned().collect()
  }

  /// Number of commits reachable from the branch HEAD
  pub async fn commit_count(&self, branch: &str) -> usize {
    let state = self.state.lock().await;
    state
      .branches
      .get(branch)
      .map_or(0, |head| state.history(head, None).len())
  }

  /// `METHOD path` for REST calls and `graphql Operation` for GraphQL calls,
  /// in arrival order
  pub fn requests(&self) -> Vec<String> {
    self.requests.lock().expect("request log").clone()
  }

  pub fn request_count(&self) -> usize {
    self.requests.lock().expect("request log").len()
  }

  fn record(&self, request: String) {
    self.requests.lock().expect("request log").push(request);
  }

  async fn put_contents(&self, path: &str, body: Value) -> Result<Value, ApiFailure> {
    let branch = str_field(&body, "branch")?.to_string();
    let expected_head = {
      let state = self.state.lock().await;
      state.head_files(&branch)?.0
    };

    if let Some(gate) = &self.write_gate {
      gate.wait().await;
    }

    self.state.lock().await.write_file(path, &expected_head, &body)
  }
}

impl Transport for FakeGitHub {
  async fn rest(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<Value>,
  ) -> Result<Value, ApiFailure> {
    tokio::task::yield_now().await;
    self.record(format!("{method} {path}"));

    let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
    match (method.as_str(), segments.as_slice()) {
      ("PUT", ["contents", rest @ ..]) => self.put_contents(&rest.join("/"), body.unwrap_or(Value::Null)).await,
      _ => self.state.lock().await.route(method.as_str(), &segments, query, body),
    }
  }

  async fn rest_raw(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>, ApiFailure> {
    tokio::task::yield_now().await;
    self.record(format!("GET {path} (raw)"));

    let Some(file) = path.strip_prefix("contents/") else {
      return Err(not_found());
    };
    self.state.lock().await.raw_contents(file, query)
  }

  async fn graphql(&self, query: &str, variables: Value) -> Result<Value, ApiFailure> {
    tokio::task::yield_now().await;
    self.record(format!("graphql {}", operation_name(query).unwrap_or_default()));

    self.state.lock().await.graphql(query, &variables)
  }
}
