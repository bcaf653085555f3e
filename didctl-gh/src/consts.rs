//! Constants for the didctl-gh client

/// User-Agent header value for the GitHub API client
pub const USER_AGENT: &str = concat!("didctl/", env!("CARGO_PKG_VERSION"));

/// Accept header value for JSON responses
pub const ACCEPT: &str = "application/vnd.github.v3+json";

/// Accept header value for raw file content
pub const ACCEPT_RAW: &str = "application/vnd.github.v3.raw";

/// Largest page GitHub serves for both REST listings and GraphQL connections
pub const PAGE_SIZE: usize = 100;

/// The one branch that can never be deleted
pub const MAIN_BRANCH: &str = "main";

/// Commit expression used when the caller does not pin a commit
pub const HEAD: &str = "HEAD";
