//! # Check Command
//!
//! Confirms the configured token can read the repository.

use anyhow::{Context, Result};

use super::Target;
use crate::utils::output::{format_branch, print_success};

pub(crate) fn handle_check_command(target: &Target) -> Result<()> {
  let (rt, db) = target.connect()?;
  let info = rt
    .block_on(db.get_repo_info())
    .with_context(|| format!("Failed to read {}/{}", db.owner(), db.repo()))?;

  print_success(&format!("Connected to {}", info.full_name));
  println!("  Default branch: {}", format_branch(&info.default_branch));
  println!("  Base branch:    {}", format_branch(db.empty_branch()));
  println!("  Visibility:     {}", if info.private { "private" } else { "public" });

  Ok(())
}
