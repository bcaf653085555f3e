//! # Command Line Interface
//!
//! Defines the CLI structure and command handlers for didctl, including
//! subcommands for tenant branches, records, tags, releases and backups.

mod backup;
mod branch;
mod check;
mod file;
mod release;
mod tag;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{ArgAction, Parser, Subcommand};
use didctl_core::DocumentKind;
use didctl_gh::GitHubDb;
use tokio::runtime::Runtime;

use crate::clients::create_runtime_and_db;
use crate::utils::output::ColorMode;

/// Top-level CLI command for didctl
#[derive(Parser)]
#[command(name = "didctl")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(about = "Maintain the GitHub repositories behind the DID Controller")]
#[command(
  long_about = "didctl drives the DID Controller's document store directly.\n\n\
        Every tenant lives on its own branch of a GitHub repository and every record\n\
        is a file on that branch. didctl provisions and prunes those branches, reads\n\
        and writes records, manages tags and releases, and dumps or restores whole\n\
        branches."
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
#[command(subcommand_required(true))]
#[command(disable_help_subcommand = true)]
#[command(max_term_width = 120)]
#[command(styles = Styles::styled()
    .header(AnsiColor::BrightGreen.on_default().bold().underline())
    .usage(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::BrightGreen.on_default().bold())
    .placeholder(AnsiColor::BrightWhite.on_default().italic())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::BrightRed.on_default().bold())
)]
pub struct Cli {
  /// Sets the level of verbosity (can be used multiple times)
  #[arg(
    short = 'v',
    long = "verbose",
    action = ArgAction::Count,
    global = true,
    long_help = "Sets the level of verbosity for tracing and logging output.\n\n\
             -v: Show info level messages\n\
             -vv: Show debug level messages\n\
             -vvv: Show trace level messages"
  )]
  pub verbose: u8,

  /// Controls when colored output is used
  #[arg(
    long,
    value_enum,
    ignore_case = true,
    global = true,
    default_value_t = ColorMode::Auto,
  )]
  pub colors: ColorMode,

  /// Path to config.toml (defaults to the platform config directory)
  #[arg(long, global = true, value_name = "PATH")]
  pub config: Option<PathBuf>,

  /// Which repository to work on
  #[arg(
    long,
    global = true,
    default_value = "did",
    value_name = "KIND",
    long_help = "Document kind whose repository the command works on.\n\n\
             did, document: the DID repository\n\
             credential, cre: the credential repository\n\
             message, msg: the message repository"
  )]
  pub kind: DocumentKind,

  /// Subcommands
  #[command(subcommand)]
  pub command: Commands,
}

/// Subcommands for didctl
#[derive(Subcommand)]
pub enum Commands {
  /// Tenant branch management
  #[command(long_about = "Manage the branches that act as tenant collections.\n\n\
            Branches are created from the empty base branch. Pruning only ever\n\
            considers tenant branches (DID_, CRE_, MSG_) and never touches main\n\
            or the empty base branch.")]
  #[command(alias = "br")]
  #[command(arg_required_else_help = true)]
  Branch(branch::BranchArgs),

  /// Verify configuration and access to the repository
  #[command(long_about = "Fetch the repository's metadata with the configured token.\n\n\
            Use this command to check that the owner, repository name and token\n\
            are correct before running anything that writes.")]
  Check,

  /// Write every file of a branch into a local directory
  #[command(long_about = "Dump the current HEAD of a branch into a local directory.\n\n\
            Every file is written at its repository path. Binary files are decoded\n\
            so the directory holds the exact bytes stored in the repository.")]
  Dump(backup::DumpArgs),

  /// Record operations on a branch
  #[command(long_about = "Read, write, list and delete files on a branch.\n\n\
            Each write is one commit. Writing content identical to what is stored\n\
            is reported and does not create a commit.")]
  #[command(alias = "f")]
  #[command(arg_required_else_help = true)]
  File(file::FileArgs),

  /// Release management
  #[command(arg_required_else_help = true)]
  Release(release::ReleaseArgs),

  /// Upload a local directory onto a branch
  #[command(long_about = "Restore a directory produced by dump (or any directory) onto a branch.\n\n\
            The branch is created from the empty base branch when missing. Files are\n\
            uploaded one commit at a time; unchanged files are skipped.")]
  Restore(backup::RestoreArgs),

  /// Tag management
  #[command(arg_required_else_help = true)]
  Tag(tag::TagArgs),
}

/// What every command needs to reach its repository
pub(crate) struct Target<'a> {
  pub config: Option<&'a Path>,
  pub kind: DocumentKind,
}

impl Target<'_> {
  pub(crate) fn connect(&self) -> Result<(Runtime, GitHubDb)> {
    create_runtime_and_db(self.config, self.kind)
  }
}

pub fn handle_cli(cli: Cli) -> Result<()> {
  // Set global color override based on --colors argument
  match cli.colors {
    ColorMode::Always | ColorMode::Yes => owo_colors::set_override(true),
    ColorMode::Never | ColorMode::No => owo_colors::set_override(false),
    ColorMode::Auto => {
      // Let owo_colors use its default auto-detection
    }
  }

  let target = Target {
    config: cli.config.as_deref(),
    kind: cli.kind,
  };

  match cli.command {
    Commands::Branch(branch) => branch::handle_branch_command(&target, branch),
    Commands::Check => check::handle_check_command(&target),
    Commands::Dump(dump) => backup::handle_dump_command(&target, dump),
    Commands::File(file) => file::handle_file_command(&target, file),
    Commands::Release(release) => release::handle_release_command(&target, release),
    Commands::Restore(restore) => backup::handle_restore_command(&target, restore),
    Commands::Tag(tag) => tag::handle_tag_command(&target, tag),
  }
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
  }

  #[test]
  fn test_global_flags_after_subcommand() -> anyhow::Result<()> {
    let cli = Cli::try_parse_from(["didctl", "branch", "list", "--kind", "msg", "-vv"])?;
    assert_eq!(cli.kind, DocumentKind::Message);
    assert_eq!(cli.verbose, 2);
    Ok(())
  }

  #[test]
  fn test_unknown_kind_is_rejected() {
    assert!(Cli::try_parse_from(["didctl", "--kind", "bogus", "check"]).is_err());
  }
}
