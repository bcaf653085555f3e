//! Temporary `config.toml` files for testing
//!
//! The guard writes a config file into a temp directory that lives as long as
//! the guard does. Tests pass its path through `--config` instead of touching
//! the user's real configuration directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::mock::{MOCK_OWNER, MOCK_REPO, MOCK_TOKEN};

pub struct ConfigFileGuard {
  temp_dir: TempDir,
  path: PathBuf,
}

impl ConfigFileGuard {
  /// Write `content` verbatim as `config.toml`
  pub fn new(content: &str) -> Result<Self> {
    let temp_dir = TempDir::new().context("Failed to create temp directory")?;
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(Self { temp_dir, path })
  }

  /// A complete config where every document kind lives in the mock
  /// repository served from `api_url`
  pub fn for_mock(api_url: &str) -> Result<Self> {
    Self::new(&format!(
      r#"[github]
owner = "{MOCK_OWNER}"
token = "{MOCK_TOKEN}"
api_url = "{api_url}"
graphql_url = "{api_url}/graphql"

[repos]
did = "{MOCK_REPO}"
credential = "{MOCK_REPO}"
message = "{MOCK_REPO}"
"#
    ))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Directory holding the file; usable as a scratch area by the test
  pub fn dir(&self) -> &Path {
    self.temp_dir.path()
  }
}
