// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the one-time repository setup. Fatal: the process exits.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Invalid repository URI '{uri}': {source}")]
    InvalidRemote { uri: String, source: git2::Error },

    #[error("Invalid access token: {0}")]
    CredentialsRejected(git2::Error),

    #[error("Invalid repository branch: '{0}' does not exist on the remote")]
    InvalidBranch(String),

    #[error("{0:?} is not a mirror of the repository; point the repository path at a new or empty directory")]
    NotAMirror(PathBuf),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Commit store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to read keyword file {path:?}: {source}")]
    Keywords { path: PathBuf, source: std::io::Error },

    #[error("Invalid keyword pattern '{pattern}': {source}")]
    InvalidKeyword { pattern: String, source: regex::Error },
}

impl SetupError {
    /// Sorts a git2 error raised while cloning into the setup taxonomy.
    pub fn classify(uri: &str, err: git2::Error) -> Self {
        use git2::{ErrorClass, ErrorCode};

        if err.code() == ErrorCode::Auth
            || matches!(err.class(), ErrorClass::Http | ErrorClass::Ssh)
        {
            return SetupError::CredentialsRejected(err);
        }
        if err.code() == ErrorCode::NotFound
            || matches!(err.class(), ErrorClass::Net | ErrorClass::Invalid)
        {
            return SetupError::InvalidRemote {
                uri: uri.to_string(),
                source: err,
            };
        }
        SetupError::Git(err)
    }

    /// Classified errors are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SetupError::Git(_))
    }
}

/// Transient failures of a single steady-state poll cycle.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Tracked branch '{0}' is missing from the mirror")]
    MissingBranch(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt commit record on line {line}: {source}")]
    Corrupt { line: usize, source: serde_json::Error },

    #[error("Failed to serialize commit: {0}")]
    Serialize(serde_json::Error),
}

/// Rejected configuration input. Never reaches the pipeline.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("'{0}' is not a number of milliseconds")]
    NotANumber(String),

    #[error("Poll interval must not be negative (got {0})")]
    Negative(i64),

    #[error("Low poll interval was not confirmed")]
    Declined,

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}
