//! # Dump and Restore
//!
//! Copy a whole branch to a local directory and back. Restore uploads one
//! file per commit; writes to one branch are never issued concurrently since
//! each would move the HEAD the others were computed against.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use didctl_gh::{BlobContent, GitHubDb};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use super::Target;
use super::file::{Upload, upload};
use crate::utils::output::{format_branch, format_path, print_info, print_success};
use crate::utils::{collect_local_files, write_local_file};

#[derive(Args)]
pub struct DumpArgs {
  /// Branch to dump
  branch: String,

  /// Target directory (created when missing)
  dir: PathBuf,
}

#[derive(Args)]
pub struct RestoreArgs {
  /// Directory to upload
  dir: PathBuf,

  /// Branch to restore onto (created from the empty base branch when missing)
  branch: String,

  /// Commit message used for every file (defaults to "Restore <path>")
  #[arg(short, long)]
  message: Option<String>,
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
  let bar = ProgressBar::new(len as u64);
  bar.set_style(ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")?.progress_chars("=> "));
  Ok(bar)
}

pub(crate) fn handle_dump_command(target: &Target, dump: DumpArgs) -> Result<()> {
  let (rt, db) = target.connect()?;

  let files = rt
    .block_on(db.get_all_files(&dump.branch))
    .with_context(|| format!("Failed to read {}", dump.branch))?;
  fs::create_dir_all(&dump.dir).with_context(|| format!("Failed to create {}", dump.dir.display()))?;

  let bar = progress_bar(files.len())?;
  for file in &files {
    bar.set_message(file.path.clone());
    let bytes = file
      .raw_bytes()
      .with_context(|| format!("{} has invalid base64 content", file.path))?;
    write_local_file(&dump.dir, &file.path, &bytes)?;
    bar.inc(1);
  }
  bar.finish_and_clear();

  print_success(&format!(
    "Dumped {} file(s) from {} into {}",
    files.len(),
    format_branch(&dump.branch),
    format_path(&dump.dir.display().to_string())
  ));
  Ok(())
}

/// Per-outcome counts of a restore
#[derive(Debug, Default, PartialEq, Eq)]
struct RestoreSummary {
  created: usize,
  updated: usize,
  unchanged: usize,
}

async fn restore(db: &GitHubDb, restore: &RestoreArgs, bar: &ProgressBar) -> Result<RestoreSummary> {
  let files = collect_local_files(&restore.dir)?;
  bar.set_length(files.len() as u64);

  db.create_branch_if_not_exist(&restore.branch)
    .await
    .with_context(|| format!("Failed to ensure branch {}", restore.branch))?;

  let mut summary = RestoreSummary::default();
  for (repo_path, local_path) in files {
    bar.set_message(repo_path.clone());
    let bytes = fs::read(&local_path).with_context(|| format!("Failed to read {}", local_path.display()))?;
    let content = BlobContent::from_file_bytes(&bytes);
    let message = restore
      .message
      .clone()
      .unwrap_or_else(|| format!("Restore {repo_path}"));

    let outcome = upload(db, &restore.branch, &repo_path, &content, Some(&message))
      .await
      .with_context(|| format!("Failed to upload {repo_path}"))?;
    debug!("{repo_path}: {outcome:?}");
    match outcome {
      Upload::Created => summary.created += 1,
      Upload::Updated => summary.updated += 1,
      Upload::Unchanged => summary.unchanged += 1,
    }
    bar.inc(1);
  }
  Ok(summary)
}

pub(crate) fn handle_restore_command(target: &Target, args: RestoreArgs) -> Result<()> {
  let (rt, db) = target.connect()?;

  let bar = progress_bar(0)?;
  let summary = rt.block_on(restore(&db, &args, &bar));
  bar.finish_and_clear();
  let summary = summary?;

  print_success(&format!(
    "Restored {} onto {}: {} created, {} updated",
    format_path(&args.dir.display().to_string()),
    format_branch(&args.branch),
    summary.created,
    summary.updated
  ));
  if summary.unchanged > 0 {
    print_info(&format!("{} file(s) unchanged", summary.unchanged));
  }
  Ok(())
}
