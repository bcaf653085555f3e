//! GitHub token discovery from `.netrc`.
//!
//! The token is normally supplied through the config file or the environment;
//! this is the fallback for operators who already keep a GitHub entry in their
//! `.netrc`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Machines checked in order of preference
pub const NETRC_MACHINES: [&str; 2] = ["api.github.com", "github.com"];

/// Returns the path to the `.netrc` file for the provided home directory.
pub fn get_netrc_path(home: &Path) -> PathBuf {
  home.join(".netrc")
}

/// Find the `password` of the first matching GitHub machine entry.
///
/// Returns `Ok(None)` when there is no `.netrc` or no GitHub entry with a
/// password.
pub fn token_from_netrc(home: &Path) -> Result<Option<String>> {
  let path = get_netrc_path(home);
  if !path.exists() {
    return Ok(None);
  }

  let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
  for machine in NETRC_MACHINES {
    if let Some(token) = password_for(&content, machine) {
      debug!("Using GitHub token from .netrc entry for {machine}");
      return Ok(Some(token));
    }
  }

  Ok(None)
}

/// Both single-line and multi-line entries are accepted since netrc is a flat
/// token stream.
fn password_for(content: &str, target_machine: &str) -> Option<String> {
  let mut tokens = content.split_whitespace();
  let mut in_target = false;

  while let Some(token) = tokens.next() {
    match token {
      "machine" => in_target = tokens.next() == Some(target_machine),
      "default" => in_target = false,
      "password" => {
        let value = tokens.next();
        if in_target {
          return value.map(str::to_string);
        }
      }
      _ => {}
    }
  }

  None
}
