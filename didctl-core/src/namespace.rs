//! # Tenant Namespaces
//!
//! Branches act as collections: every company, credential bucket and message
//! bucket gets its own branch, and each record is a file named after its id.
//! This module owns those naming rules plus git's ref-name validation.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::anyhow;
use regex::Regex;

pub const DID_PREFIX: &str = "DID_";
pub const CREDENTIAL_PREFIX: &str = "CRE_";
pub const MESSAGE_PREFIX: &str = "MSG_";

/// Characters of a hash or public key used to pick its bucket branch
pub const BUCKET_PREFIX_LEN: usize = 3;

static FORBIDDEN_REF_CHARS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[\x00-\x20\x7f~^:?*\[\\]").expect("Failed to compile ref name regex"));

/// Kinds of records stored by the DID controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
  Did,
  Document,
  Credential,
  Message,
}

impl DocumentKind {
  pub const fn extension(self) -> &'static str {
    match self {
      DocumentKind::Did => "did",
      DocumentKind::Document => "document",
      DocumentKind::Credential => "cre",
      DocumentKind::Message => "msg",
    }
  }

  /// Branch holding a record of this kind. `owner` is the company name for
  /// DIDs and documents, the credential hash or the recipient public key
  /// otherwise.
  pub fn branch_for(self, owner: &str) -> String {
    match self {
      DocumentKind::Did | DocumentKind::Document => format!("{DID_PREFIX}{owner}"),
      DocumentKind::Credential => format!("{CREDENTIAL_PREFIX}{}", bucket(owner)),
      DocumentKind::Message => format!("{MESSAGE_PREFIX}{}", bucket(owner)),
    }
  }

  /// File path of a record inside its branch
  pub fn record_path(self, id: &str) -> String {
    format!("{id}.{}", self.extension())
  }
}

impl fmt::Display for DocumentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      DocumentKind::Did => "did",
      DocumentKind::Document => "document",
      DocumentKind::Credential => "credential",
      DocumentKind::Message => "message",
    };
    f.write_str(name)
  }
}

impl FromStr for DocumentKind {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "did" => Ok(DocumentKind::Did),
      "document" | "doc" => Ok(DocumentKind::Document),
      "credential" | "cre" => Ok(DocumentKind::Credential),
      "message" | "msg" => Ok(DocumentKind::Message),
      other => Err(anyhow!("Unknown document kind: {other}")),
    }
  }
}

fn bucket(key: &str) -> String {
  let key = key.strip_prefix("0x").unwrap_or(key);
  key.chars().take(BUCKET_PREFIX_LEN).collect()
}

/// A tenant branch recognised by its prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Namespace {
  Company(String),
  CredentialBucket(String),
  MessageBucket(String),
}

impl Namespace {
  /// Classify a branch name; `None` for anything that is not a tenant branch
  /// (`main`, the empty base branch, ad-hoc branches).
  pub fn parse(branch: &str) -> Option<Self> {
    let non_empty = |rest: &str| (!rest.is_empty()).then(|| rest.to_string());

    if let Some(rest) = branch.strip_prefix(DID_PREFIX) {
      non_empty(rest).map(Namespace::Company)
    } else if let Some(rest) = branch.strip_prefix(CREDENTIAL_PREFIX) {
      non_empty(rest).map(Namespace::CredentialBucket)
    } else if let Some(rest) = branch.strip_prefix(MESSAGE_PREFIX) {
      non_empty(rest).map(Namespace::MessageBucket)
    } else {
      None
    }
  }
}

/// Check a branch or tag short name against `git check-ref-format` rules.
pub fn is_valid_ref_name(name: &str) -> bool {
  if name.is_empty() || name == "@" {
    return false;
  }
  if name.starts_with('/') || name.ends_with('/') || name.ends_with('.') {
    return false;
  }
  if name.contains("..") || name.contains("@{") || name.contains("//") {
    return false;
  }
  if FORBIDDEN_REF_CHARS.is_match(name) {
    return false;
  }

  name
    .split('/')
    .all(|component| !component.starts_with('.') && !component.ends_with(".lock"))
}
