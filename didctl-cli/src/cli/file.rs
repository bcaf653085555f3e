//! # File Command
//!
//! Record operations on a single branch. Each write becomes one commit.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use didctl_core::DocumentKind;
use didctl_gh::{BlobContent, DbError, EntryKind, GitHubDb};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::Target;
use crate::utils::output::{format_path, format_sha, format_timestamp, print_info, print_success, short_sha};

/// Command for record operations
#[derive(Args)]
pub struct FileArgs {
  /// The subcommand to execute
  #[command(subcommand)]
  pub subcommand: FileSubcommands,
}

/// Subcommands for the file command
#[derive(Subcommand)]
pub enum FileSubcommands {
  /// Print a file (JSON is pretty-printed)
  Get {
    branch: String,
    path: String,

    /// Read the file as of this commit instead of the branch HEAD
    #[arg(long, value_name = "SHA")]
    commit: Option<String>,

    /// Write the exact stored bytes to a local file instead of printing
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
  },

  /// Create or update a file from a local file
  Put {
    branch: String,
    path: String,
    /// Local file to upload
    local: PathBuf,

    /// Commit message
    #[arg(short, long)]
    message: Option<String>,
  },

  /// Delete a file
  #[command(alias = "rm")]
  Delete {
    branch: String,
    path: String,

    /// Commit message
    #[arg(short, long)]
    message: Option<String>,
  },

  /// List a directory
  #[command(alias = "ls")]
  List {
    branch: String,
    /// Directory to list (the root when omitted)
    #[arg(default_value = "")]
    path: String,
  },

  /// Show the commits that touched a file
  History { branch: String, path: String },

  /// Print the branch and path a record of --kind is stored at
  #[command(long_about = "Print where a record lives without contacting GitHub.\n\n\
            OWNER is the company name for DIDs and documents, the credential hash\n\
            for credentials and the recipient public key for messages. The output\n\
            is the branch and the path, ready for `file get`.")]
  Locate {
    /// Company, credential hash or recipient public key
    owner: String,
    /// Record id
    id: String,
  },
}

/// Branch and path of record `id` owned by `owner`
fn locate(kind: DocumentKind, owner: &str, id: &str) -> (String, String) {
  (kind.branch_for(owner), kind.record_path(id))
}

pub(crate) fn handle_file_command(target: &Target, file: FileArgs) -> Result<()> {
  if let FileSubcommands::Locate { owner, id } = &file.subcommand {
    let (branch, path) = locate(target.kind, owner, id);
    println!("{branch} {path}");
    return Ok(());
  }

  let (rt, db) = target.connect()?;
  match file.subcommand {
    FileSubcommands::Get {
      branch,
      path,
      commit,
      output,
    } => rt.block_on(get_file(&db, &path, commit.as_deref().unwrap_or(&branch), output)),
    FileSubcommands::Put {
      branch,
      path,
      local,
      message,
    } => rt.block_on(put_file(&db, &branch, &path, &local, message)),
    FileSubcommands::Delete { branch, path, message } => {
      let commit = rt
        .block_on(db.delete_file(&path, &branch, message.as_deref()))
        .with_context(|| format!("Failed to delete {path} on {branch}"))?;
      print_success(&format!("Deleted {} in {}", format_path(&path), format_sha(&commit)));
      Ok(())
    }
    FileSubcommands::List { branch, path } => rt.block_on(list_files(&db, &branch, &path)),
    FileSubcommands::History { branch, path } => rt.block_on(show_history(&db, &branch, &path)),
    FileSubcommands::Locate { .. } => Ok(()),
  }
}

async fn get_file(db: &GitHubDb, path: &str, commit: &str, output: Option<PathBuf>) -> Result<()> {
  let file = db
    .get_file(path, commit)
    .await
    .with_context(|| format!("Failed to read {path} at {commit}"))?;

  if let Some(output) = output {
    let bytes = file.raw_bytes().context("Stored content is not valid base64")?;
    fs::write(&output, bytes).with_context(|| format!("Failed to write {}", output.display()))?;
    print_success(&format!("Wrote {} to {}", format_path(path), output.display()));
    return Ok(());
  }

  match &file.content {
    BlobContent::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
    BlobContent::Text(text) => {
      let mut stdout = std::io::stdout().lock();
      stdout.write_all(text.as_bytes())?;
      if !text.ends_with('\n') {
        writeln!(stdout)?;
      }
    }
    BlobContent::Binary(encoded) => {
      print_info(&format!("{path} is binary ({} bytes), showing base64", file.byte_size));
      println!("{encoded}");
    }
  }
  Ok(())
}

/// Outcome of uploading one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Upload {
  Created,
  Updated,
  Unchanged,
}

/// Create `path`, or update it when it already exists. Identical content is
/// not an error.
pub(crate) async fn upload(
  db: &GitHubDb,
  branch: &str,
  path: &str,
  content: &BlobContent,
  message: Option<&str>,
) -> Result<Upload> {
  if db.is_existed_file(path, branch).await? {
    let message = message.map_or_else(|| format!("Update {path}"), str::to_string);
    match db.update_file(path, content, branch, &message).await {
      Ok(_) => Ok(Upload::Updated),
      Err(DbError::DataNotChanged) => Ok(Upload::Unchanged),
      Err(e) => Err(e.into()),
    }
  } else {
    let message = message.map_or_else(|| format!("Create {path}"), str::to_string);
    db.create_new_file(path, content, branch, &message).await?;
    Ok(Upload::Created)
  }
}

async fn put_file(
  db: &GitHubDb,
  branch: &str,
  path: &str,
  local: &std::path::Path,
  message: Option<String>,
) -> Result<()> {
  let bytes = fs::read(local).with_context(|| format!("Failed to read {}", local.display()))?;
  let content = BlobContent::from_file_bytes(&bytes);

  let outcome = upload(db, branch, path, &content, message.as_deref())
    .await
    .with_context(|| format!("Failed to write {path} on {branch}"))?;
  match outcome {
    Upload::Created => print_success(&format!("Created {}", format_path(path))),
    Upload::Updated => print_success(&format!("Updated {}", format_path(path))),
    Upload::Unchanged => print_info(&format!("{path} is unchanged, nothing committed")),
  }
  Ok(())
}

async fn list_files(db: &GitHubDb, branch: &str, path: &str) -> Result<()> {
  #[derive(Tabled)]
  struct EntryRow {
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Path")]
    path: String,
  }

  let entries = db
    .get_files_of_tree(path, true, branch, false)
    .await
    .with_context(|| format!("Failed to list {path:?} on {branch}"))?;

  if entries.is_empty() {
    print_info("Directory is empty.");
    return Ok(());
  }

  let rows: Vec<EntryRow> = entries
    .into_iter()
    .map(|entry| EntryRow {
      kind: match entry.kind {
        EntryKind::Blob => "file",
        EntryKind::Tree => "dir",
        EntryKind::Commit => "submodule",
      },
      path: entry.path,
    })
    .collect();
  println!("{}", Table::new(rows).with(Style::sharp()));
  Ok(())
}

async fn show_history(db: &GitHubDb, branch: &str, path: &str) -> Result<()> {
  #[derive(Tabled)]
  struct CommitRow {
    #[tabled(rename = "Commit")]
    sha: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Message")]
    message: String,
  }

  let history = db
    .get_commit_history(None, branch, Some(path))
    .await
    .with_context(|| format!("Failed to read the history of {path} on {branch}"))?;

  let rows: Vec<CommitRow> = history
    .history
    .iter()
    .map(|commit| CommitRow {
      sha: short_sha(&commit.oid).to_string(),
      date: format_timestamp(&commit.committed_date),
      message: commit.message.lines().next().unwrap_or_default().to_string(),
    })
    .collect();
  println!("{}", Table::new(rows).with(Style::sharp()));
  print_info(&format!("{} commit(s)", history.total_count));
  Ok(())
}
