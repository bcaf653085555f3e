//! # Configuration Management
//!
//! Loads the didctl configuration once at process start from a TOML file and
//! environment overrides, and derives the per-repository [`GitHubDbConfig`]
//! that is injected into each storage facade. Nothing below this module reads
//! the process environment.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::credentials::token_from_netrc;
use crate::namespace::DocumentKind;

/// Base URL for the official SaaS GitHub REST API
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// GraphQL endpoint for the official SaaS GitHub API
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Branch every tenant branch is forked from
pub const DEFAULT_EMPTY_BRANCH: &str = "empty_branch";

pub const ENV_OWNER: &str = "DIDCTL_GITHUB_OWNER";
pub const ENV_TOKEN: &str = "DIDCTL_GITHUB_TOKEN";
pub const ENV_DID_REPO: &str = "DIDCTL_DID_REPO";
pub const ENV_CRE_REPO: &str = "DIDCTL_CRE_REPO";
pub const ENV_MSG_REPO: &str = "DIDCTL_MSG_REPO";
pub const ENV_API_URL: &str = "DIDCTL_API_URL";
pub const ENV_GRAPHQL_URL: &str = "DIDCTL_GRAPHQL_URL";
pub const ENV_EMPTY_BRANCH: &str = "DIDCTL_EMPTY_BRANCH";

/// Connection settings for one GitHub repository used as a database.
#[derive(Clone, PartialEq, Eq)]
pub struct GitHubDbConfig {
  pub owner: String,
  pub repo: String,
  pub token: String,
  pub api_base_url: String,
  pub graphql_url: String,
  pub empty_branch: String,
}

impl GitHubDbConfig {
  /// Create a config pointed at api.github.com
  pub fn new(owner: impl Into<String>, repo: impl Into<String>, token: impl Into<String>) -> Self {
    Self {
      owner: owner.into(),
      repo: repo.into(),
      token: token.into(),
      api_base_url: DEFAULT_API_BASE_URL.to_string(),
      graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
      empty_branch: DEFAULT_EMPTY_BRANCH.to_string(),
    }
  }

  /// Point both REST and GraphQL calls at another host (GitHub Enterprise or a
  /// mock server). The GraphQL endpoint becomes `<base>/graphql`.
  pub fn with_base_url(mut self, base_url: &str) -> Self {
    let base = base_url.trim_end_matches('/');
    self.api_base_url = base.to_string();
    self.graphql_url = format!("{base}/graphql");
    self
  }

  pub fn with_empty_branch(mut self, empty_branch: impl Into<String>) -> Self {
    self.empty_branch = empty_branch.into();
    self
  }

  /// REST prefix every repository-scoped path is resolved against
  pub fn repo_url(&self) -> String {
    format!("{}/repos/{}/{}", self.api_base_url, self.owner, self.repo)
  }
}

impl fmt::Debug for GitHubDbConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("GitHubDbConfig")
      .field("owner", &self.owner)
      .field("repo", &self.repo)
      .field("token", &"<redacted>")
      .field("api_base_url", &self.api_base_url)
      .field("graphql_url", &self.graphql_url)
      .field("empty_branch", &self.empty_branch)
      .finish()
  }
}

/// Repository names per document kind. They may all point at the same
/// repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoNames {
  pub did: String,
  pub credential: String,
  pub message: String,
}

/// Process-level configuration for every storage facade didctl builds.
#[derive(Clone, PartialEq, Eq)]
pub struct DidctlConfig {
  pub owner: String,
  pub token: String,
  pub repos: RepoNames,
  pub api_base_url: String,
  pub graphql_url: String,
  pub empty_branch: String,
}

impl fmt::Debug for DidctlConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DidctlConfig")
      .field("owner", &self.owner)
      .field("token", &"<redacted>")
      .field("repos", &self.repos)
      .field("api_base_url", &self.api_base_url)
      .field("graphql_url", &self.graphql_url)
      .field("empty_branch", &self.empty_branch)
      .finish()
  }
}

/// On-disk shape of `config.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
  pub github: GitHubSection,
  pub repos: RepoSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
  pub owner: Option<String>,
  pub token: Option<String>,
  pub api_url: Option<String>,
  pub graphql_url: Option<String>,
  pub empty_branch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RepoSection {
  pub did: Option<String>,
  pub credential: Option<String>,
  pub message: Option<String>,
}

impl FileConfig {
  /// Parse a config file, returning the default (empty) config when it does
  /// not exist.
  pub fn load(path: &Path) -> Result<Self> {
    if !path.exists() {
      debug!("No config file at {}", path.display());
      return Ok(Self::default());
    }

    let content =
      fs::read_to_string(path).with_context(|| format!("Failed to read config from {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config from {}", path.display()))
  }
}

impl DidctlConfig {
  /// Load the configuration from `path` (or the default config location),
  /// the process environment and, for the token only, `~/.netrc`.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let config_path = match path {
      Some(path) => path.to_path_buf(),
      None => ConfigDirs::new()?.config_path(),
    };
    let file = FileConfig::load(&config_path)?;
    let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());

    Self::from_sources(file, |key| std::env::var(key).ok(), home.as_deref())
  }

  /// Merge file values with overrides from `lookup`; environment wins.
  pub fn from_sources<F>(file: FileConfig, lookup: F, netrc_home: Option<&Path>) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let non_blank = |value: &String| !value.trim().is_empty();
    let pick = |key: &str, fallback: Option<String>| lookup(key).filter(non_blank).or(fallback.filter(non_blank));

    let token = match pick(ENV_TOKEN, file.github.token) {
      Some(token) => token,
      None => match netrc_home {
        Some(home) => token_from_netrc(home)?.context("No GitHub token configured and none found in .netrc")?,
        None => bail!("No GitHub token configured"),
      },
    };

    let config = Self {
      owner: pick(ENV_OWNER, file.github.owner).unwrap_or_default(),
      token,
      repos: RepoNames {
        did: pick(ENV_DID_REPO, file.repos.did).unwrap_or_default(),
        credential: pick(ENV_CRE_REPO, file.repos.credential).unwrap_or_default(),
        message: pick(ENV_MSG_REPO, file.repos.message).unwrap_or_default(),
      },
      api_base_url: pick(ENV_API_URL, file.github.api_url).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
      graphql_url: pick(ENV_GRAPHQL_URL, file.github.graphql_url).unwrap_or_else(|| DEFAULT_GRAPHQL_URL.to_string()),
      empty_branch: pick(ENV_EMPTY_BRANCH, file.github.empty_branch)
        .unwrap_or_else(|| DEFAULT_EMPTY_BRANCH.to_string()),
    };

    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.token.trim().is_empty() {
      bail!("GitHub token is empty (set {ENV_TOKEN}, github.token or a .netrc entry)");
    }
    if self.owner.trim().is_empty() {
      bail!("GitHub owner is not configured (set {ENV_OWNER} or github.owner)");
    }
    for (kind, name, env) in [
      ("DID", &self.repos.did, ENV_DID_REPO),
      ("credential", &self.repos.credential, ENV_CRE_REPO),
      ("message", &self.repos.message, ENV_MSG_REPO),
    ] {
      if name.trim().is_empty() {
        bail!("The {kind} repository is not configured (set {env} or the [repos] table)");
      }
    }
    Url::parse(&self.api_base_url).with_context(|| format!("Invalid API URL: {}", self.api_base_url))?;
    Url::parse(&self.graphql_url).with_context(|| format!("Invalid GraphQL URL: {}", self.graphql_url))?;
    Ok(())
  }

  /// Repository holding records of the given kind
  pub fn repo_for(&self, kind: DocumentKind) -> &str {
    match kind {
      DocumentKind::Did | DocumentKind::Document => &self.repos.did,
      DocumentKind::Credential => &self.repos.credential,
      DocumentKind::Message => &self.repos.message,
    }
  }

  /// Facade configuration for the repository holding `kind` records
  pub fn db_config(&self, kind: DocumentKind) -> GitHubDbConfig {
    GitHubDbConfig {
      owner: self.owner.clone(),
      repo: self.repo_for(kind).to_string(),
      token: self.token.clone(),
      api_base_url: self.api_base_url.trim_end_matches('/').to_string(),
      graphql_url: self.graphql_url.clone(),
      empty_branch: self.empty_branch.clone(),
    }
  }
}

/// Represents the configuration directories for didctl
#[derive(Debug, Clone)]
pub struct ConfigDirs {
  pub config_dir: PathBuf,
}

impl ConfigDirs {
  /// Resolve the XDG (or platform equivalent) config directory
  pub fn new() -> Result<Self> {
    let proj_dirs = ProjectDirs::from("", "", "didctl").context("Failed to determine project directories")?;

    Ok(Self {
      config_dir: proj_dirs.config_dir().to_path_buf(),
    })
  }

  /// Get the path to the main configuration file
  pub fn config_path(&self) -> PathBuf {
    self.config_dir.join("config.toml")
  }
}
