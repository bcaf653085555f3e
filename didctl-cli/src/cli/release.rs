//! # Release Command
//!
//! Releases pin a commit (by default the head of `main`) under a tag with a
//! description. Deleting a release removes its tag as well.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::Target;
use crate::utils::output::{format_timestamp, print_info, print_success};

/// Command for release management
#[derive(Args)]
pub struct ReleaseArgs {
  /// The subcommand to execute
  #[command(subcommand)]
  pub subcommand: ReleaseSubcommands,
}

/// Subcommands for the release command
#[derive(Subcommand)]
pub enum ReleaseSubcommands {
  /// List releases, newest first
  #[command(alias = "ls")]
  List,

  /// Publish a release
  Create {
    /// Tag of the release; created when missing
    tag: String,

    /// Release description
    #[arg(short, long)]
    message: Option<String>,

    /// Commit or branch to release (defaults to main)
    #[arg(long)]
    commit: Option<String>,
  },

  /// Delete a release and its tag
  #[command(alias = "rm")]
  Delete { tag: String },
}

pub(crate) fn handle_release_command(target: &Target, release: ReleaseArgs) -> Result<()> {
  let (rt, db) = target.connect()?;

  match release.subcommand {
    ReleaseSubcommands::List => {
      #[derive(Tabled)]
      struct ReleaseRow {
        #[tabled(rename = "Tag")]
        tag: String,
        #[tabled(rename = "Target")]
        target: String,
        #[tabled(rename = "Created")]
        created: String,
        #[tabled(rename = "Description")]
        description: String,
      }

      let releases = rt.block_on(db.get_all_releases()).context("Failed to list releases")?;
      if releases.is_empty() {
        print_info("No releases.");
        return Ok(());
      }
      let rows: Vec<ReleaseRow> = releases
        .into_iter()
        .map(|release| ReleaseRow {
          created: format_timestamp(&release.created_at),
          description: release.body.unwrap_or_default(),
          target: release.target_commitish,
          tag: release.tag_name,
        })
        .collect();
      println!("{}", Table::new(rows).with(Style::sharp()));
    }
    ReleaseSubcommands::Create { tag, message, commit } => {
      let release = rt
        .block_on(db.tag_commit_as_release(&tag, message.as_deref(), commit.as_deref()))
        .with_context(|| format!("Failed to publish release {tag}"))?;
      print_success(&format!("Published {} at {}", release.tag_name, release.target_commitish));
    }
    ReleaseSubcommands::Delete { tag } => {
      rt.block_on(db.delete_release(&tag))
        .with_context(|| format!("Failed to delete release {tag}"))?;
      print_success(&format!("Deleted release {tag}"));
    }
  }

  Ok(())
}
