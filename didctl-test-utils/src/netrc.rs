use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// RAII guard for test .netrc files
///
/// This struct creates a temporary home directory holding a `.netrc` with the
/// given content. The process environment is left alone; tests hand
/// [`NetrcGuard::home_dir`] to the code under test (or set `HOME` on a child
/// process) instead.
pub struct NetrcGuard {
  temp_dir: TempDir,
  netrc_path: PathBuf,
}

impl NetrcGuard {
  /// Create a new NetrcGuard with the given content
  pub fn new(content: &str) -> Result<Self> {
    let temp_dir = TempDir::new().context("Failed to create temp directory")?;
    let netrc_path = temp_dir.path().join(".netrc");
    fs::write(&netrc_path, content).context("Failed to write test .netrc")?;

    Ok(Self { temp_dir, netrc_path })
  }

  /// A `.netrc` holding a single GitHub API entry
  pub fn with_github_token(token: &str) -> Result<Self> {
    Self::new(&format!("machine api.github.com\n  login x-access-token\n  password {token}\n"))
  }

  /// Get the path to the .netrc file
  pub fn netrc_path(&self) -> &Path {
    &self.netrc_path
  }

  /// Get the path to the temporary home directory
  pub fn home_dir(&self) -> &Path {
    self.temp_dir.path()
  }
}
