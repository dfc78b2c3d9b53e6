//! Typed errors for the editor's fallible edges
//!
//! Only [`SaveError`] ever reaches the user, through the footer.
//! Everything else has a fallback and is merely logged.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A `monitorrule=` line that could not be turned into a rule
#[derive(Debug, Error, PartialEq)]
pub enum RuleParseError {
    #[error("line does not start with the rule marker")]
    MissingMarker,
    #[error("rule has no name")]
    MissingName,
    #[error("invalid value {value:?} for key '{key}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("transform {0} is outside 0..=7")]
    TransformOutOfRange(i64),
    #[error("vrr must be 0 or 1, got {0}")]
    VrrOutOfRange(i64),
    #[error("positional rule has {found} fields, expected at least {expected}")]
    TooFewFields { found: usize, expected: usize },
}

/// Reading or rewriting the monitor config file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to replace {path}: {source}")]
    Persist { path: PathBuf, source: io::Error },
}

/// Loading or storing the editor's own preferences
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("failed to read preferences {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write preferences {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why output or mode discovery fell back to the built-in lists
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to run output helper '{program}': {source}")]
    Spawn { program: String, source: io::Error },
    #[error("failed to read output of helper '{program}': {source}")]
    HelperRead { program: String, source: io::Error },
    #[error("output helper '{program}' exited with {status}")]
    HelperFailed { program: String, status: std::process::ExitStatus },
    #[error("output helper '{program}' did not finish within {millis} ms")]
    Timeout { program: String, millis: u128 },
    #[error("output helper listed no outputs")]
    NoOutputs,
    #[error("failed to read {path}: {source}")]
    DrmRead { path: PathBuf, source: io::Error },
    #[error("no DRM entry for output '{0}'")]
    NoDrmEntry(String),
    #[error("no modes listed for output '{0}'")]
    NoModes(String),
}

/// A save from the grid; shown in the footer
#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Prefs(#[from] PrefsError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
