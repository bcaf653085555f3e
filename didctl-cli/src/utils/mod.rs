//! # Utility Functions
//!
//! Terminal output helpers and local file handling shared by the commands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

pub mod output;

/// Every regular file under `root` as `(repository path, local path)`,
/// sorted by repository path. Repository paths always use `/`.
pub fn collect_local_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
  if !root.is_dir() {
    bail!("{} is not a directory", root.display());
  }

  let mut files = Vec::new();
  for entry in WalkDir::new(root).follow_links(false) {
    let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
    if !entry.file_type().is_file() {
      continue;
    }
    let relative = entry
      .path()
      .strip_prefix(root)
      .with_context(|| format!("{} is outside {}", entry.path().display(), root.display()))?;
    let repo_path = relative
      .components()
      .map(|component| component.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/");
    files.push((repo_path, entry.into_path()));
  }

  files.sort_by(|a, b| a.0.cmp(&b.0));
  Ok(files)
}

/// Write `bytes` to `root/<repository path>`, creating parent directories
pub fn write_local_file(root: &Path, repo_path: &str, bytes: &[u8]) -> Result<PathBuf> {
  if repo_path.split('/').any(|segment| segment == ".." || segment.is_empty()) {
    bail!("Refusing to write suspicious path {repo_path}");
  }

  let target = root.join(repo_path);
  if let Some(parent) = target.parent() {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
  }
  fs::write(&target, bytes).with_context(|| format!("Failed to write {}", target.display()))?;
  Ok(target)
}
