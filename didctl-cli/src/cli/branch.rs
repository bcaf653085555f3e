//! # Branch Command
//!
//! Tenant branch lifecycle: listing, provisioning from the empty base branch,
//! deletion and pruning of stale tenants.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Args, Subcommand};
use dialoguer::Confirm;
use didctl_core::Namespace;
use didctl_gh::consts::MAIN_BRANCH;
use didctl_gh::{Branch, GitHubDb};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::debug;

use super::Target;
use crate::utils::output::{
  format_branch, format_command, format_sha, format_timestamp, print_error, print_header, print_info, print_success,
  print_warning, short_sha,
};

/// Command for tenant branch management
#[derive(Args)]
pub struct BranchArgs {
  /// The subcommand to execute
  #[command(subcommand)]
  pub subcommand: BranchSubcommands,
}

/// Subcommands for the branch command
#[derive(Subcommand)]
pub enum BranchSubcommands {
  /// List branches
  #[command(alias = "ls")]
  List {
    /// Only show branches starting with this prefix (e.g. DID_)
    #[arg(long)]
    prefix: Option<String>,
  },

  /// Create a branch
  Create {
    /// Name of the new branch
    name: String,

    /// Branch to fork from (defaults to the empty base branch)
    #[arg(long, value_name = "BRANCH")]
    from: Option<String>,
  },

  /// Create a branch from the empty base branch unless it already exists
  Ensure {
    /// Name of the branch
    name: String,
  },

  /// Delete a branch
  #[command(alias = "rm")]
  Delete {
    /// Name of the branch
    name: String,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
  },

  /// Delete tenant branches whose last commit is older than a cutoff
  #[command(long_about = "Delete tenant branches that have not been written to recently.\n\n\
            Only branches recognised as tenant namespaces (DID_, CRE_, MSG_) and\n\
            matching --prefix are considered. main and the empty base branch are\n\
            never deleted. Each deletion is confirmed unless --yes is given.")]
  Prune(PruneArgs),
}

#[derive(Args)]
pub struct PruneArgs {
  /// Only consider branches starting with this prefix
  #[arg(long)]
  prefix: String,

  /// Branches whose HEAD commit is older than this many days are stale
  #[arg(long = "older-than-days", value_name = "DAYS")]
  older_than_days: u32,

  /// Show what would be deleted without deleting anything
  #[arg(long)]
  dry_run: bool,

  /// Delete without asking
  #[arg(short = 'y', long)]
  yes: bool,
}

pub(crate) fn handle_branch_command(target: &Target, branch: BranchArgs) -> Result<()> {
  match branch.subcommand {
    BranchSubcommands::List { prefix } => handle_list_command(target, prefix.as_deref()),
    BranchSubcommands::Create { name, from } => handle_create_command(target, &name, from.as_deref()),
    BranchSubcommands::Ensure { name } => handle_ensure_command(target, &name),
    BranchSubcommands::Delete { name, yes } => handle_delete_command(target, &name, yes),
    BranchSubcommands::Prune(prune) => handle_prune_command(target, &prune),
  }
}

fn describe_namespace(name: &str) -> String {
  match Namespace::parse(name) {
    Some(Namespace::Company(company)) => format!("company {company}"),
    Some(Namespace::CredentialBucket(bucket)) => format!("credentials {bucket}"),
    Some(Namespace::MessageBucket(bucket)) => format!("messages {bucket}"),
    None => "-".to_string(),
  }
}

fn handle_list_command(target: &Target, prefix: Option<&str>) -> Result<()> {
  #[derive(Tabled)]
  struct BranchRow {
    #[tabled(rename = "Branch")]
    name: String,
    #[tabled(rename = "Head")]
    head: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
  }

  let (rt, db) = target.connect()?;
  let branches = rt.block_on(db.get_all_branches()).context("Failed to list branches")?;

  let rows: Vec<BranchRow> = branches
    .into_iter()
    .filter(|branch| prefix.is_none_or(|prefix| branch.name.starts_with(prefix)))
    .map(|branch| BranchRow {
      namespace: describe_namespace(&branch.name),
      head: short_sha(&branch.commit.sha).to_string(),
      name: branch.name,
    })
    .collect();

  if rows.is_empty() {
    print_info("No matching branches.");
    println!("Create one with {}", format_command("didctl branch ensure <name>"));
    return Ok(());
  }

  let count = rows.len();
  println!("{}", Table::new(rows).with(Style::sharp()));
  print_info(&format!("{count} branch(es)"));
  Ok(())
}

fn handle_create_command(target: &Target, name: &str, from: Option<&str>) -> Result<()> {
  let (rt, db) = target.connect()?;
  let from = from.unwrap_or(db.empty_branch()).to_string();

  let git_ref = rt
    .block_on(db.checkout_new_branch(name, &from))
    .with_context(|| format!("Failed to create branch {name}"))?;
  print_success(&format!(
    "Created {} from {} at {}",
    format_branch(name),
    format_branch(&from),
    format_sha(&git_ref.object.sha)
  ));
  Ok(())
}

fn handle_ensure_command(target: &Target, name: &str) -> Result<()> {
  let (rt, db) = target.connect()?;
  let branch = rt
    .block_on(db.create_branch_if_not_exist(name))
    .with_context(|| format!("Failed to ensure branch {name}"))?;
  print_success(&format!(
    "{} is at {}",
    format_branch(&branch.name),
    format_sha(&branch.commit.sha)
  ));
  Ok(())
}

fn confirm(prompt: String) -> bool {
  Confirm::new()
    .with_prompt(prompt)
    .default(false)
    .interact()
    .unwrap_or(false)
}

fn handle_delete_command(target: &Target, name: &str, yes: bool) -> Result<()> {
  let (rt, db) = target.connect()?;

  if name != MAIN_BRANCH && !yes && !confirm(format!("Delete branch '{name}'?")) {
    print_info("Aborted.");
    return Ok(());
  }

  rt.block_on(db.delete_branch(name))
    .with_context(|| format!("Failed to delete branch {name}"))?;
  print_success(&format!("Deleted {}", format_branch(name)));
  Ok(())
}

/// A tenant branch and the date of its HEAD commit
struct StaleBranch {
  name: String,
  last_commit: DateTime<Utc>,
}

/// True when the branch is neither `main` nor the base branch and is a
/// tenant namespace matching `prefix`
fn is_prune_candidate(name: &str, prefix: &str, empty_branch: &str) -> bool {
  name != MAIN_BRANCH && name != empty_branch && name.starts_with(prefix) && Namespace::parse(name).is_some()
}

/// A cutoff before the representable range makes nothing stale
fn is_stale(last_commit: DateTime<Utc>, now: DateTime<Utc>, older_than_days: u32) -> bool {
  TimeDelta::try_days(i64::from(older_than_days))
    .and_then(|age| now.checked_sub_signed(age))
    .is_some_and(|cutoff| last_commit < cutoff)
}

async fn find_stale_branches(
  db: &GitHubDb,
  branches: Vec<Branch>,
  older_than_days: u32,
  now: DateTime<Utc>,
) -> Result<Vec<StaleBranch>> {
  let mut stale = Vec::new();
  for branch in branches {
    let history = db
      .get_commit_history(Some(1), &branch.name, None)
      .await
      .with_context(|| format!("Failed to read the history of {}", branch.name))?;
    let Some(head) = history.history.into_iter().next() else {
      debug!("{} has no commits", branch.name);
      continue;
    };
    if is_stale(head.committed_date, now, older_than_days) {
      stale.push(StaleBranch {
        name: branch.name,
        last_commit: head.committed_date,
      });
    }
  }
  Ok(stale)
}

fn handle_prune_command(target: &Target, prune: &PruneArgs) -> Result<()> {
  let (rt, db) = target.connect()?;

  let branches = rt.block_on(db.get_all_branches()).context("Failed to list branches")?;
  let candidates: Vec<Branch> = branches
    .into_iter()
    .filter(|branch| is_prune_candidate(&branch.name, &prune.prefix, db.empty_branch()))
    .collect();
  debug!("{} prune candidates", candidates.len());

  let stale = rt.block_on(find_stale_branches(&db, candidates, prune.older_than_days, Utc::now()))?;
  if stale.is_empty() {
    print_info(&format!(
      "No branches under {} older than {} day(s).",
      prune.prefix, prune.older_than_days
    ));
    return Ok(());
  }

  print_header(&format!("Found {} stale branch(es)", stale.len()));

  if prune.dry_run {
    for branch in &stale {
      println!("  {} (last commit {})", branch.name, format_timestamp(&branch.last_commit));
    }
    println!();
    print_info("Dry run: no branches were deleted.");
    return Ok(());
  }

  let mut deleted_count: u32 = 0;
  let mut skipped_count: u32 = 0;

  for branch in &stale {
    println!("  {} (last commit {})", branch.name, format_timestamp(&branch.last_commit));

    if !prune.yes && !confirm(format!("  Delete '{}'?", branch.name)) {
      skipped_count += 1;
      continue;
    }

    match rt.block_on(db.delete_branch_if_exist(&branch.name)) {
      Ok(true) => {
        print_success(&format!("  Deleted {}", branch.name));
        deleted_count += 1;
      }
      Ok(false) => {
        print_warning(&format!("  {} was already gone", branch.name));
        skipped_count += 1;
      }
      Err(e) => print_error(&format!("  Failed to delete {}: {e}", branch.name)),
    }
  }

  // Summary
  println!();
  if deleted_count > 0 {
    print_success(&format!("Pruned {deleted_count} branch(es)"));
  }
  if skipped_count > 0 {
    print_info(&format!("Skipped {skipped_count} branch(es)"));
  }

  Ok(())
}
