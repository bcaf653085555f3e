//! # Client Creation
//!
//! Every command talks to one repository, picked by the document kind. This
//! module loads the configuration and builds the runtime and facade for it.

use std::path::Path;

use anyhow::{Context, Result};
use didctl_core::{DidctlConfig, DocumentKind};
use didctl_gh::GitHubDb;
use tokio::runtime::Runtime;
use tracing::debug;

/// Creates a tokio runtime and a facade for the repository holding `kind`
/// records
///
/// This is a convenience function for CLI commands that need both a runtime
/// and a storage facade.
pub fn create_runtime_and_db(config_path: Option<&Path>, kind: DocumentKind) -> Result<(Runtime, GitHubDb)> {
  let config = DidctlConfig::load(config_path).context("Failed to load didctl configuration")?;
  let db_config = config.db_config(kind);
  debug!("Using {} for {kind} records", db_config.repo_url());

  let rt = Runtime::new().context("Failed to create async runtime")?;
  Ok((rt, GitHubDb::new(db_config)))
}
