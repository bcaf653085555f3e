//! # Path and Id Helpers
//!
//! Small helpers for building GraphQL object expressions and repository paths,
//! and for recognising git object ids.

use std::sync::LazyLock;

use regex::Regex;

static GIT_OBJECT_ID_REGEX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("Failed to compile git object id regex"));

/// `<commit>:<path>` expression understood by GraphQL `object(expression:)`
pub fn object_expression(commit: &str, path: &str) -> String {
  format!("{commit}:{}", path.trim_matches('/'))
}

/// Join a directory and an entry name; an empty directory is the tree root
pub fn join_path(dir: &str, name: &str) -> String {
  let dir = dir.trim_matches('/');
  if dir.is_empty() {
    name.to_string()
  } else {
    format!("{dir}/{name}")
  }
}

/// Full 40-character lowercase hex SHA-1
pub fn is_git_object_id(id: &str) -> bool {
  GIT_OBJECT_ID_REGEX.is_match(id)
}
