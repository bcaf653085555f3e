//! # didctl CLI Library
//!
//! Command definitions and handlers for the didctl command-line tool: tenant
//! branch provisioning and pruning, record CRUD, tags and releases, and
//! dump/restore of whole branches.

pub mod cli;
pub mod clients;
pub mod utils;
