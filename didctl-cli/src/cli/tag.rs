//! # Tag Command

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::Target;
use crate::utils::output::{format_sha, print_info, print_success, short_sha};

/// Command for tag management
#[derive(Args)]
pub struct TagArgs {
  /// The subcommand to execute
  #[command(subcommand)]
  pub subcommand: TagSubcommands,
}

/// Subcommands for the tag command
#[derive(Subcommand)]
pub enum TagSubcommands {
  /// List tags, reverse alphabetical
  #[command(alias = "ls")]
  List,

  /// Tag a commit
  Create {
    name: String,
    /// Commit to tag
    sha: String,
  },

  /// Delete a tag
  #[command(alias = "rm")]
  Delete { name: String },
}

pub(crate) fn handle_tag_command(target: &Target, tag: TagArgs) -> Result<()> {
  let (rt, db) = target.connect()?;

  match tag.subcommand {
    TagSubcommands::List => {
      #[derive(Tabled)]
      struct TagRow {
        #[tabled(rename = "Tag")]
        name: String,
        #[tabled(rename = "Target")]
        target: String,
      }

      let tags = rt.block_on(db.get_all_tags()).context("Failed to list tags")?;
      if tags.is_empty() {
        print_info("No tags.");
        return Ok(());
      }
      let rows: Vec<TagRow> = tags
        .into_iter()
        .map(|tag| TagRow {
          target: short_sha(&tag.target_oid).to_string(),
          name: tag.name,
        })
        .collect();
      println!("{}", Table::new(rows).with(Style::sharp()));
    }
    TagSubcommands::Create { name, sha } => {
      rt.block_on(db.tag(&name, &sha))
        .with_context(|| format!("Failed to create tag {name}"))?;
      print_success(&format!("Tagged {} as {name}", format_sha(&sha)));
    }
    TagSubcommands::Delete { name } => {
      rt.block_on(db.delete_a_tag(&name))
        .with_context(|| format!("Failed to delete tag {name}"))?;
      print_success(&format!("Deleted tag {name}"));
    }
  }

  Ok(())
}
